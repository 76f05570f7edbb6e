//! LLM Provider implementations and factory
//!
//! Submodules implement specific providers; `create_provider` selects one
//! from the opaque `{type, config}` model spec.

pub mod databricks;
pub mod openai;

use std::sync::Arc;

use crate::core::{ModelSpec, ParleyError, Result};
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::databricks::DatabricksProvider;
use self::openai::OpenAIProvider;

/// Create a new LLM provider based on the model spec
pub fn create_provider(spec: &ModelSpec) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match spec.provider.to_lowercase().as_str() {
        "ollama" => Arc::new(OllamaClient::from_spec(spec)?),
        "openai" => Arc::new(OpenAIProvider::from_spec(spec)?),
        "databricks" => Arc::new(DatabricksProvider::from_spec(spec)?),
        other => {
            return Err(ParleyError::config(format!("Unknown model type: {}", other)));
        }
    };
    Ok(provider)
}
