//! OpenAI Provider
//!
//! Chat Completions client. Also serves OpenAI-compatible endpoints such as
//! Databricks model serving, which only differ in URL and authentication.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::{ContentPart, Message, ModelSpec, ParleyError, Result, ToolCallRequest};
use crate::llm::traits::{ChatRequest, LLMProvider, LLMResponse, TokenUsage};
use crate::llm::truncate_for_log;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    /// Whether the model name goes into the request body
    send_model: bool,
    name: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
    /// Plain `{"response": "..."}` shape used by some serving endpoints
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAIProvider {
    /// Build from a model spec
    ///
    /// Options: `apiKey` (or `OPENAI_API_KEY`), `model`, `baseUrl`,
    /// `temperature`, `maxTokens`, `timeoutSecs`.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let api_key = spec
            .string_option("apiKey", Some("OPENAI_API_KEY"))
            .ok_or_else(|| {
                ParleyError::config(
                    "OpenAI API key is required. Set apiKey in the model config or OPENAI_API_KEY.",
                )
            })?;

        let base_url = spec
            .string_option("baseUrl", Some("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = parse_url(&format!("{}/chat/completions", base_url.trim_end_matches('/')))?;

        let model = spec
            .string_option("model", None)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::build(spec, endpoint, api_key, model, true, "openai")
    }

    /// Build a client for an arbitrary OpenAI-compatible endpoint
    pub(crate) fn build(
        spec: &ModelSpec,
        endpoint: Url,
        api_key: String,
        model: String,
        send_model: bool,
        name: &'static str,
    ) -> Result<Self> {
        let timeout = spec.u64_option("timeoutSecs").unwrap_or(300);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| ParleyError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            temperature: spec.f64_option("temperature"),
            max_tokens: spec.u64_option("maxTokens"),
            send_model,
            name,
        })
    }

    /// Override sampling defaults when the model config leaves them unset
    pub(crate) fn with_defaults(mut self, temperature: f64, max_tokens: u64) -> Self {
        self.temperature.get_or_insert(temperature);
        self.max_tokens.get_or_insert(max_tokens);
        self
    }

    /// URL requests are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn to_wire_message(msg: &Message) -> serde_json::Value {
        match msg {
            Message::System { content } => json!({"role": "system", "content": flatten(content)}),
            Message::User { content } => {
                if content.iter().any(ContentPart::is_image) {
                    let parts: Vec<serde_json::Value> = content
                        .iter()
                        .map(|part| match part {
                            ContentPart::Text { text } => json!({"type": "text", "text": text}),
                            image => json!({
                                "type": "image_url",
                                "image_url": {"url": image.data_url().unwrap_or_default()}
                            }),
                        })
                        .collect();
                    json!({"role": "user", "content": parts})
                } else {
                    json!({"role": "user", "content": flatten(content)})
                }
            }
            Message::Assistant { content, .. } => {
                json!({"role": "assistant", "content": flatten(content)})
            }
            Message::AssistantWithToolCalls { tool_calls } => {
                let calls: Vec<serde_json::Value> = tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {"name": tc.name, "arguments": tc.arguments.to_string()}
                        })
                    })
                    .collect();
                json!({"role": "assistant", "content": null, "tool_calls": calls})
            }
            Message::Tool {
                tool_call_id,
                result,
                ..
            } => json!({"role": "tool", "tool_call_id": tool_call_id, "content": flatten(result)}),
        }
    }

    /// Convert the conversation to wire messages
    ///
    /// Tool messages only carry text, so images a tool returned are noted
    /// inline and re-sent as `image_url` parts in a user message placed after
    /// the run of tool results.
    fn to_wire_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        let mut wire = Vec::with_capacity(messages.len());
        let mut pending: Vec<serde_json::Value> = Vec::new();

        for msg in messages {
            if !matches!(msg, Message::Tool { .. }) && !pending.is_empty() {
                wire.push(json!({"role": "user", "content": std::mem::take(&mut pending)}));
            }

            if let Message::Tool {
                tool_name, result, ..
            } = msg
            {
                let images: Vec<serde_json::Value> = result
                    .iter()
                    .filter_map(ContentPart::data_url)
                    .map(|url| json!({"type": "image_url", "image_url": {"url": url}}))
                    .collect();
                if !images.is_empty() {
                    let label = format!("Images returned by {}:", tool_name);
                    pending.push(json!({"type": "text", "text": label}));
                    pending.extend(images);
                }
            }

            wire.push(Self::to_wire_message(msg));
        }

        if !pending.is_empty() {
            wire.push(json!({"role": "user", "content": pending}));
        }
        wire
    }

    fn to_llm_response(&self, response: CompletionResponse) -> Result<LLMResponse> {
        let usage = response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
        let model = response.model.unwrap_or_else(|| self.model.clone());

        if let Some(choice) = response.choices.into_iter().next() {
            let (content, wire_calls) = match choice.message {
                Some(message) => (
                    message.content.or(choice.text).unwrap_or_default(),
                    message.tool_calls.unwrap_or_default(),
                ),
                None => (choice.text.unwrap_or_default(), Vec::new()),
            };

            let tool_calls = wire_calls
                .into_iter()
                .map(|call| {
                    let arguments = if call.function.arguments.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str(&call.function.arguments).map_err(|e| {
                            ParleyError::provider(format!(
                                "Malformed arguments for tool call '{}': {}",
                                call.function.name, e
                            ))
                        })?
                    };
                    Ok(ToolCallRequest::new(call.id, call.function.name, arguments))
                })
                .collect::<Result<Vec<_>>>()?;

            return Ok(LLMResponse {
                content,
                tool_calls,
                usage,
                model,
            });
        }

        match response.response {
            Some(content) => Ok(LLMResponse {
                content,
                tool_calls: Vec::new(),
                usage,
                model,
            }),
            None => Err(ParleyError::provider(format!(
                "Unexpected {} response format: no choices",
                self.name
            ))),
        }
    }
}

/// Flatten content to the string form accepted by every role; images are noted inline
fn flatten(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => text.clone(),
            ContentPart::Image { mime_type, .. } => format!("[image: {}]", mime_type),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ParleyError::config(format!("Invalid URL '{}': {}", raw, e)))
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<LLMResponse> {
        let mut body = json!({
            "messages": Self::to_wire_messages(request.messages),
        });

        if self.send_model {
            body["model"] = json!(self.model);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(request.tools)?;
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.output_schema.is_some() {
            body["response_format"] = json!({"type": "json_object"});
        }

        debug!(provider = self.name, request = %truncate_for_log(&body.to_string()), "Chat request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ParleyError::provider(format!(
                        "Network error connecting to {}: {}",
                        self.endpoint, e
                    ))
                } else {
                    ParleyError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 && error_text.contains("model") {
                return Err(ParleyError::ModelNotFound(self.model.clone()));
            }

            return Err(ParleyError::provider(format!(
                "{} API error ({}): {}",
                self.name, status, error_text
            )));
        }

        let response_text = response.text().await?;
        debug!(provider = self.name, response = %truncate_for_log(&response_text), "Chat response");

        let completion: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| ParleyError::provider(format!("Failed to parse response: {}", e)))?;

        self.to_llm_response(completion)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}
