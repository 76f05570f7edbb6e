//! Databricks Provider
//!
//! Model serving endpoints speak the OpenAI chat format at
//! `{host}/serving-endpoints/{endpoint}/invocations`.

use async_trait::async_trait;

use crate::core::{ModelSpec, ParleyError, Result};
use crate::llm::provider::openai::{parse_url, OpenAIProvider};
use crate::llm::traits::{ChatRequest, LLMProvider, LLMResponse};

const DEFAULT_TEMPERATURE: f64 = 0.1;
const DEFAULT_MAX_TOKENS: u64 = 512;

pub struct DatabricksProvider {
    inner: OpenAIProvider,
}

impl DatabricksProvider {
    /// Build from a model spec
    ///
    /// Options: `host` (or `DATABRICKS_HOST`), `model` or `endpoint`,
    /// `apiKey` (or `DATABRICKS_API_KEY`), `temperature` (0.1), `maxTokens` (512).
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let host = spec.string_option("host", Some("DATABRICKS_HOST")).ok_or_else(|| {
            ParleyError::config(
                "Databricks host is required. Set host in config or DATABRICKS_HOST environment variable.",
            )
        })?;

        let model = spec
            .string_option("model", None)
            .or_else(|| spec.string_option("endpoint", None))
            .ok_or_else(|| {
                ParleyError::config("Databricks model/endpoint is required. Set model in config.")
            })?;

        let api_key = spec
            .string_option("apiKey", Some("DATABRICKS_API_KEY"))
            .ok_or_else(|| {
                ParleyError::config(
                    "Databricks API key is required. Set apiKey in config or DATABRICKS_API_KEY environment variable.",
                )
            })?;

        let endpoint = parse_url(&format!(
            "{}/serving-endpoints/{}/invocations",
            host.trim_end_matches('/'),
            model
        ))?;

        let inner = OpenAIProvider::build(spec, endpoint, api_key, model, false, "databricks")?
            .with_defaults(DEFAULT_TEMPERATURE, DEFAULT_MAX_TOKENS);

        Ok(Self { inner })
    }
}

#[async_trait]
impl LLMProvider for DatabricksProvider {
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<LLMResponse> {
        self.inner.invoke(request).await
    }

    fn name(&self) -> &str {
        "databricks"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
