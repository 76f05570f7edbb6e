//! A tool served by an MCP server

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::client::McpClient;
use super::protocol::{CallToolResult, McpContent, McpToolDefinition};
use crate::core::{render_text, ContentPart, ParleyError, Result};
use crate::tools::context::ToolContext;
use crate::tools::registry::Capability;

pub struct McpTool {
    definition: McpToolDefinition,
    client: Arc<McpClient>,
}

impl McpTool {
    pub fn new(definition: McpToolDefinition, client: Arc<McpClient>) -> Self {
        Self { definition, client }
    }

    /// Server the tool belongs to
    pub fn server(&self) -> &str {
        self.client.server()
    }
}

#[async_trait]
impl Capability for McpTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }

    async fn invoke(&self, arguments: Value, _ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let result = self.client.call_tool(&self.definition.name, arguments).await?;
        into_parts(result)
    }
}

/// Map a call result to content parts; a result flagged as an error fails the call
fn into_parts(result: CallToolResult) -> Result<Vec<ContentPart>> {
    let parts: Vec<ContentPart> = result
        .content
        .into_iter()
        .filter_map(|content| match content {
            McpContent::Text { text } => Some(ContentPart::text(text)),
            McpContent::Image { data, mime_type } => Some(ContentPart::image_base64(mime_type, data)),
            McpContent::Unsupported => None,
        })
        .collect();

    if result.is_error {
        let message = render_text(&parts);
        return Err(ParleyError::tool(if message.is_empty() {
            "MCP tool reported an error".to_string()
        } else {
            message
        }));
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(value: Value) -> CallToolResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_and_image_content() {
        let parts = into_parts(result(json!({
            "content": [
                {"type": "text", "text": "a chart"},
                {"type": "image", "data": "cG5n", "mimeType": "image/png"},
                {"type": "audio", "data": "AAA", "mimeType": "audio/wav"}
            ]
        })))
        .unwrap();

        assert_eq!(
            parts,
            vec![ContentPart::text("a chart"), ContentPart::image("image/png", b"png")]
        );
    }

    #[test]
    fn test_error_flag_fails_the_call() {
        let err = into_parts(result(json!({
            "content": [{"type": "text", "text": "city not found"}],
            "isError": true
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Tool execution error: city not found");

        let err = into_parts(result(json!({"isError": true}))).unwrap_err();
        assert!(err.to_string().ends_with("MCP tool reported an error"));
    }
}
