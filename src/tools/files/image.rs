//! Save image tool
//!
//! Accepts raw base64 or a `data:image/...;base64,` URL.

use std::sync::LazyLock;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde_json::{json, Value};

use crate::core::{ContentPart, ParleyError, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::{io_message, text_result};
use crate::tools::registry::Capability;

static DATA_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/[^;]+;base64,").expect("valid regex"));

static BASE64_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]+=*$").expect("valid regex"));

/// Writes base64 image data to a file
pub struct SaveImageTool;

impl SaveImageTool {
    fn decode(content: &str) -> Result<Vec<u8>> {
        let content = content.trim();
        if !content.starts_with("data:image/") && !BASE64_BODY.is_match(content) {
            let preview: String = content.chars().take(100).collect();
            return Err(ParleyError::tool(format!(
                "Invalid image content format. Expected base64 data or data URL (data:image/...), but received: {}...",
                preview
            )));
        }

        let body = DATA_URL_PREFIX.replace(content, "");
        BASE64
            .decode(body.as_bytes())
            .map_err(|e| ParleyError::tool(format!("Invalid base64 image data: {}", e)))
    }
}

#[async_trait]
impl Capability for SaveImageTool {
    fn name(&self) -> &str {
        "saveImage"
    }

    fn description(&self) -> &str {
        "Save base64 image data (or a data:image URL) to a file in the current directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "imageName": {
                    "type": "string",
                    "description": "Path of the image file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Base64 image data or data URL"
                }
            },
            "required": ["imageName", "content"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let name = arguments["imageName"].as_str().unwrap_or_default();
        let content = arguments["content"].as_str().unwrap_or_default();
        let path = ctx.writable_path(name)?;
        let bytes = Self::decode(content)?;

        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            return Ok(text_result(io_message(&e, "Directory not found")));
        }
        if !existed {
            ctx.created().record(path);
        }

        Ok(text_result(format!("Image saved to {}", name)))
    }
}
