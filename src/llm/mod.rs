//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction the execution loop talks to, the
//! concrete backends, and the output schema used for structured answers.

pub mod mock;
pub mod ollama;
pub mod provider;
pub mod schema;
pub mod traits;

pub use mock::MockProvider;
pub use ollama::OllamaClient;
pub use provider::create_provider;
pub use schema::OutputSchema;
pub use traits::{ChatRequest, LLMProvider, LLMResponse, ModelResponse, TokenUsage};

/// Shorten a payload for debug logs
pub(crate) fn truncate_for_log(content: &str) -> String {
    const LIMIT: usize = 500;
    match content.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
