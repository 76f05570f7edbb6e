//! Create directory tool

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{ContentPart, ParleyError, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::text_result;
use crate::tools::registry::Capability;

/// Creates a directory tree inside the working directory
pub struct CreateDirectoryTool;

#[async_trait]
impl Capability for CreateDirectoryTool {
    fn name(&self) -> &str {
        "createDirectory"
    }

    fn description(&self) -> &str {
        "Create a directory, including missing parents, in the current directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to create"
                }
            },
            "required": ["path"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let raw = arguments["path"].as_str().unwrap_or_default();
        let path = ctx.writable_path(raw)?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(text_result("directory already exists"));
        }

        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            ParleyError::with_context(format!("Failed to create directory {}", raw), e)
        })?;
        ctx.created().record(path);

        Ok(text_result("directory created"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());

        let parts = CreateDirectoryTool
            .invoke(json!({"path": "a/b"}), &ctx)
            .await
            .unwrap();
        assert_eq!(parts, vec![ContentPart::text("directory created")]);
        assert!(dir.path().join("a/b").is_dir());
        assert_eq!(ctx.created().list(), vec![ctx.resolve("a/b")]);
    }

    #[tokio::test]
    async fn test_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("present")).unwrap();
        let ctx = ToolContext::new(dir.path());

        let parts = CreateDirectoryTool
            .invoke(json!({"path": "present"}), &ctx)
            .await
            .unwrap();
        assert_eq!(parts, vec![ContentPart::text("directory already exists")]);
        assert!(ctx.created().list().is_empty());
    }
}
