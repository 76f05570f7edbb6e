//! Write file tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::{ContentPart, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::{io_message, text_result};
use crate::tools::registry::Capability;

/// Writes text to a file inside the working directory
pub struct WriteFileTool;

#[async_trait]
impl Capability for WriteFileTool {
    fn name(&self) -> &str {
        "writeFile"
    }

    fn description(&self) -> &str {
        "Write text content to a local file in the current directory, replacing it if it exists."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": "Path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Text to write"
                }
            },
            "required": ["file", "content"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let file = arguments["file"].as_str().unwrap_or_default();
        let content = arguments["content"].as_str().unwrap_or_default();
        let path = ctx.writable_path(file)?;

        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);

        if let Err(e) = tokio::fs::write(&path, content).await {
            return Ok(text_result(io_message(&e, "File not found")));
        }

        if !existed {
            debug!(path = %path.display(), "Recording created file");
            ctx.created().record(path);
        }

        Ok(text_result("file created"))
    }
}
