//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API with tool calling and native
//! structured output.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{ContentPart, Message, ModelSpec, ParleyError, Result, ToolCallRequest, ToolDefinition};
use crate::llm::traits::{generate_call_id, ChatRequest, LLMProvider, LLMResponse, TokenUsage};
use crate::llm::truncate_for_log;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    options: OllamaOptions,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    options: &'a OllamaOptions,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

/// Ollama tool call format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Ollama generation options
#[derive(Debug, Clone, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u64>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaClient {
    /// Create a new Ollama client from a model spec
    ///
    /// Options: `host` (or `OLLAMA_HOST`), `model`, `temperature`,
    /// `maxTokens`, `timeoutSecs`.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let timeout = spec.u64_option("timeoutSecs").unwrap_or(300);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| ParleyError::config(format!("Failed to create HTTP client: {}", e)))?;

        let host = spec
            .string_option("host", Some("OLLAMA_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{}", host)
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: spec
                .string_option("model", None)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            options: OllamaOptions {
                temperature: spec.f64_option("temperature"),
                num_predict: spec.u64_option("maxTokens"),
            },
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert internal Message to Ollama format
    fn to_ollama_message(msg: &Message) -> OllamaMessage {
        let images = msg
            .parts()
            .iter()
            .filter_map(|part| match part {
                ContentPart::Image { data, .. } => Some(data.clone()),
                ContentPart::Text { .. } => None,
            })
            .collect();

        let role = match msg {
            Message::AssistantWithToolCalls { .. } => "assistant".to_string(),
            other => other.role().to_string(),
        };

        let tool_calls = match msg {
            Message::AssistantWithToolCalls { tool_calls } => Some(
                tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        id: Some(tc.id.clone()),
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            ),
            _ => None,
        };

        let tool_name = match msg {
            Message::Tool { tool_name, .. } => Some(tool_name.clone()),
            _ => None,
        };

        OllamaMessage {
            role,
            content: msg.text(),
            images,
            tool_calls,
            tool_name,
        }
    }

    /// Convert Ollama response to LLMResponse
    fn to_llm_response(response: OllamaChatResponse) -> LLMResponse {
        let tool_calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id.unwrap_or_else(generate_call_id),
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage::new(prompt, completion)),
            _ => None,
        };

        LLMResponse {
            content: response.message.content,
            tool_calls,
            usage,
            model: response.model,
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<LLMResponse> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(Self::to_ollama_message).collect(),
            tools: (!request.tools.is_empty()).then_some(request.tools),
            format: request.output_schema.map(|schema| schema.json_schema()),
            options: &self.options,
            stream: false,
        };

        debug!(request = %truncate_for_log(&serde_json::to_string(&body)?), "Ollama request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ParleyError::provider(format!(
                        "Cannot connect to Ollama at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    ParleyError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 && error_text.contains("not found") {
                return Err(ParleyError::ModelNotFound(self.model.clone()));
            }

            return Err(ParleyError::provider(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        debug!(response = %truncate_for_log(&response_text), "Ollama response");

        let chat_response: OllamaChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ParleyError::provider(format!("Failed to parse response: {}", e)))?;

        Ok(Self::to_llm_response(chat_response))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OutputSchema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        let spec = ModelSpec::new("ollama")
            .with_option("host", json!(server.uri()))
            .with_option("model", json!("llama3.1"))
            .with_option("temperature", json!(0.3));
        OllamaClient::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let spec = ModelSpec::new("ollama")
            .with_option("host", json!("127.0.0.1:11434/"))
            .with_option("model", json!("qwen3:8b"));
        let client = OllamaClient::from_spec(&spec).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
        assert_eq!(client.model(), "qwen3:8b");
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message::User {
            content: vec![
                ContentPart::text("What is this?"),
                ContentPart::image("image/png", b"png"),
            ],
        };
        let ollama_msg = OllamaClient::to_ollama_message(&msg);
        assert_eq!(ollama_msg.role, "user");
        assert_eq!(ollama_msg.content, "What is this?");
        assert_eq!(ollama_msg.images, vec!["cG5n".to_string()]);
    }

    #[test]
    fn test_tool_messages_conversion() {
        let calls = Message::tool_calls(vec![ToolCallRequest::new(
            "call_1",
            "readFile",
            json!({"file": "x.txt"}),
        )]);
        let converted = OllamaClient::to_ollama_message(&calls);
        assert_eq!(converted.role, "assistant");
        assert_eq!(converted.tool_calls.unwrap()[0].function.name, "readFile");

        let result = Message::tool_result("call_1", "readFile", vec![ContentPart::text("hello")]);
        let converted = OllamaClient::to_ollama_message(&result);
        assert_eq!(converted.role, "tool");
        assert_eq!(converted.tool_name.as_deref(), Some("readFile"));
        assert_eq!(converted.content, "hello");
    }

    #[test]
    fn test_response_without_ids_gets_generated_ids() {
        let response: OllamaChatResponse = serde_json::from_value(json!({
            "model": "llama3.1",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "readFile", "arguments": {"file": "x.txt"}}}]
            },
            "prompt_eval_count": 10,
            "eval_count": 5
        }))
        .unwrap();

        let llm = OllamaClient::to_llm_response(response);
        assert_eq!(llm.tool_calls.len(), 1);
        assert!(llm.tool_calls[0].id.starts_with("call_"));
        assert_eq!(llm.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_invoke_sends_tools_and_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.1",
                "stream": false,
                "options": {"temperature": 0.3},
                "format": {"type": "object", "required": ["answer"]},
                "tools": [{"type": "function", "function": {"name": "readFile"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "{\"answer\": \"42\"}"},
                "prompt_eval_count": 4,
                "eval_count": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = vec![Message::user("Question?")];
        let tools = vec![ToolDefinition::function(
            "readFile",
            "Read a file",
            json!({"type": "object"}),
        )];
        let schema = OutputSchema::new([("answer", "the answer")]);
        let request = ChatRequest::new(&messages)
            .with_tools(&tools)
            .with_output_schema(Some(&schema));

        let response = client_for(&server).invoke(request).await.unwrap();
        assert_eq!(response.content, "{\"answer\": \"42\"}");
        assert_eq!(response.usage.unwrap().total_tokens, 6);
    }

    #[tokio::test]
    async fn test_unknown_model_maps_to_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "model \"llama3.1\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let messages = vec![Message::user("hi")];
        let err = client_for(&server)
            .invoke(ChatRequest::new(&messages))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::ModelNotFound(ref m) if m == "llama3.1"));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let messages = vec![Message::user("hi")];
        let err = client_for(&server)
            .invoke(ChatRequest::new(&messages))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Provider(_)));
        assert!(err.to_string().contains("Ollama API error (500"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let messages = vec![Message::user("hi")];
        let err = client_for(&server)
            .invoke(ChatRequest::new(&messages))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse response"));
    }
}
