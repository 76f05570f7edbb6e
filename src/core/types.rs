//! Shared types used across Parley modules
//!
//! Contains the conversation message model, tool call requests and tool
//! definitions. Messages are a single tagged enum so every consumer matches
//! on the role instead of probing the shape of the payload.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::core::error::ParleyError;

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Inline image, base64 encoded
    Image {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
    },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from raw bytes
    pub fn image(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Create an image part from data that is already base64 encoded
    pub fn image_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Get the text if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }

    /// Whether this part carries an image
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }

    /// Render as a `data:` URL (images only)
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Image { mime_type, data } => Some(format!("data:{};base64,{}", mime_type, data)),
            Self::Text { .. } => None,
        }
    }
}

/// Join the text parts of a content sequence, skipping images
pub fn render_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(ContentPart::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation key between the request and its result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    /// Create a new tool call request
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    AssistantWithToolCalls,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::AssistantWithToolCalls => write!(f, "assistant_with_tool_calls"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for Role {
    type Err = ParleyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" | "human" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            "assistant_with_tool_calls" => Ok(Role::AssistantWithToolCalls),
            "tool" => Ok(Role::Tool),
            other => Err(ParleyError::input(format!("Unknown message role: {}", other))),
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: Vec<ContentPart>,
    },
    User {
        content: Vec<ContentPart>,
    },
    Assistant {
        content: Vec<ContentPart>,
        /// Parsed answer when an output schema was in effect
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured: Option<serde_json::Value>,
    },
    AssistantWithToolCalls {
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        result: Vec<ContentPart>,
    },
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: vec![ContentPart::text(content)],
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: vec![ContentPart::text(content)],
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: vec![ContentPart::text(content)],
            structured: None,
        }
    }

    /// Create an assistant message carrying a structured answer
    pub fn assistant_structured(rendered: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Assistant {
            content: vec![ContentPart::text(rendered)],
            structured: Some(value),
        }
    }

    /// Create a message recording a batch of tool calls
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::AssistantWithToolCalls { tool_calls }
    }

    /// Create a tool result message
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: Vec<ContentPart>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
        }
    }

    /// Get the role of this message
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::AssistantWithToolCalls { .. } => Role::AssistantWithToolCalls,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Whether this is a system message
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// Content parts of this message (tool results for tool messages)
    pub fn parts(&self) -> &[ContentPart] {
        match self {
            Self::System { content } | Self::User { content } | Self::Assistant { content, .. } => {
                content
            }
            Self::Tool { result, .. } => result,
            Self::AssistantWithToolCalls { .. } => &[],
        }
    }

    /// Text of this message with image parts skipped
    pub fn text(&self) -> String {
        render_text(self.parts())
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Name of the tool
    pub fn name(&self) -> &str {
        &self.function.name
    }
}
