//! Scripted provider for tests and offline runs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::{Message, ParleyError, Result};
use crate::llm::traits::{ChatRequest, LLMProvider, LLMResponse};

/// What the mock does on its next invocation
enum Step {
    Respond(LLMResponse),
    Fail(String),
}

/// A mock provider that returns pre-configured responses and records every
/// conversation snapshot it receives
#[derive(Clone, Default)]
pub struct MockProvider {
    steps: Arc<Mutex<VecDeque<Step>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub had_output_schema: bool,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<LLMResponse>) -> Self {
        let mock = Self::default();
        for response in responses {
            mock.push(response);
        }
        mock
    }

    /// Queue another response
    pub fn push(&self, response: LLMResponse) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(Step::Respond(response));
        }
    }

    /// Queue a provider failure
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(Step::Fail(message.into()));
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<LLMResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: request.messages.to_vec(),
                tool_names: request.tools.iter().map(|t| t.name().to_string()).collect(),
                had_output_schema: request.output_schema.is_some(),
            });
        }

        let step = self
            .steps
            .lock()
            .map_err(|_| ParleyError::provider("mock provider poisoned"))?
            .pop_front();

        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(ParleyError::provider(message)),
            None => Err(ParleyError::provider("mock provider has no more responses")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}
