//! Read file tool

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{ContentPart, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::{io_message, text_result};
use crate::tools::registry::Capability;

/// Returns the text content of a file
pub struct ReadFileTool;

#[async_trait]
impl Capability for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read the content of a local text file. Paths are relative to the current directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": "Path of the file to read"
                }
            },
            "required": ["file"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let file = arguments["file"].as_str().unwrap_or_default();
        let path = ctx.readable_path(file)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(text_result(content)),
            Err(e) => Ok(text_result(io_message(&e, "File not found"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParleyError;

    #[tokio::test]
    async fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let ctx = ToolContext::new(dir.path());

        let parts = ReadFileTool.invoke(json!({"file": "notes.txt"}), &ctx).await.unwrap();
        assert_eq!(parts, vec![ContentPart::text("hello")]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());

        let parts = ReadFileTool.invoke(json!({"file": "nope.txt"}), &ctx).await.unwrap();
        assert_eq!(parts, vec![ContentPart::text("File not found")]);
    }

    #[tokio::test]
    async fn test_outside_working_dir_denied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().join("inner"));

        let err = ReadFileTool
            .invoke(json!({"file": "../secret.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::AccessDenied(_)));
    }
}
