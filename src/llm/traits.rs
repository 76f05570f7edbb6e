//! LLM Provider trait for abstracting different backends
//!
//! Enables swapping between Ollama, OpenAI, Databricks, etc. Every provider
//! sees the same message taxonomy and answers with either a final message or
//! a batch of tool calls.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolCallRequest, ToolDefinition};
use crate::llm::schema::OutputSchema;

/// Everything a provider needs for one invocation
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Full conversation snapshot, system messages first
    pub messages: &'a [Message],
    /// Tools bound for this conversation
    pub tools: &'a [ToolDefinition],
    /// Structured answer contract, if any
    pub output_schema: Option<&'a OutputSchema>,
}

impl<'a> ChatRequest<'a> {
    /// Create a request without tools or schema
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            tools: &[],
            output_schema: None,
        }
    }

    /// Bind tool definitions
    pub fn with_tools(mut self, tools: &'a [ToolDefinition]) -> Self {
        self.tools = tools;
        self
    }

    /// Attach an output schema
    pub fn with_output_schema(mut self, schema: Option<&'a OutputSchema>) -> Self {
        self.output_schema = schema;
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// Text content of the response
    pub content: String,
    /// Any tool calls the model wants to make
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl LLMResponse {
    /// Create a final text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a response requesting tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            ..Default::default()
        }
    }

    /// Classify the response for the execution loop
    pub fn into_outcome(self) -> ModelResponse {
        if self.tool_calls.is_empty() {
            ModelResponse::Final(self.content)
        } else {
            ModelResponse::ToolCalls(self.tool_calls)
        }
    }
}

/// What the execution loop does next
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The model is done; raw answer text
    Final(String),
    /// The model needs these tools executed first
    ToolCalls(Vec<ToolCallRequest>),
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the conversation snapshot with bound tools to the model
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<LLMResponse>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// Generate a tool call id for providers that do not return one
pub fn generate_call_id() -> String {
    use rand::distr::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("call_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(
            LLMResponse::text("4").into_outcome(),
            ModelResponse::Final("4".to_string())
        );

        let call = ToolCallRequest::new("c1", "readFile", json!({"file": "x.txt"}));
        assert_eq!(
            LLMResponse::with_tool_calls(vec![call.clone()]).into_outcome(),
            ModelResponse::ToolCalls(vec![call])
        );
    }

    #[test]
    fn test_generated_call_ids_are_unique() {
        let a = generate_call_id();
        let b = generate_call_id();
        assert!(a.starts_with("call_"));
        assert_eq!(a.len(), 17);
        assert_ne!(a, b);
    }
}
