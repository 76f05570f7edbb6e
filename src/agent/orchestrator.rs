//! Agent orchestrator
//!
//! Drives one conversation: resolves templates, appends turns, calls the
//! model, runs requested tools in order and decides when the turn is done.
//!
//! The loop is iterative. Each iteration builds a prompt from the message
//! store, invokes the model once, and either finishes or appends one
//! `assistant_with_tool_calls` message followed by one `tool` message per
//! request before iterating again. Failures inside the loop are flushed to
//! the history file and reported as the answer, so the caller always gets
//! a final line of text.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::agent::attachments;
use crate::agent::conversation::Conversation;
use crate::agent::history;
use crate::agent::loop_state::AgentLoopState;
use crate::agent::variables::{resolve_variables, ParamSource};
use crate::core::{
    AgentConfig, ContentPart, Message, ParleyError, Result, Role, ToolCallRequest, ToolDefinition,
};
use crate::llm::{ChatRequest, LLMProvider, ModelResponse, OutputSchema};
use crate::tools::ToolRegistry;

type AnswerCallback = Box<dyn FnMut(&str) + Send>;

/// Main agent that orchestrates the model, tools and conversation
pub struct Agent {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    conversation: Conversation,
    history_file: Option<PathBuf>,
    output_schema: Option<OutputSchema>,
    callback: Option<AnswerCallback>,
}

impl Agent {
    /// Create an agent for a single conversation
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
            conversation: Conversation::new(),
            history_file: None,
            output_schema: None,
            callback: None,
        }
    }

    /// Add a system message built from a template; empty text is ignored
    pub async fn instructions(&mut self, text: &str, params: &dyn ParamSource) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let resolved = resolve_variables(text, params).await?;
        self.conversation.append(Message::system(resolved));
        Ok(())
    }

    /// Resume from a history file and persist to it from now on
    ///
    /// Returns how many messages were loaded; an absent or malformed file
    /// loads nothing.
    pub async fn load_history(&mut self, path: impl Into<PathBuf>) -> usize {
        let path = path.into();
        let loaded = self.conversation.load(history::read(&path).await);
        debug!(path = %path.display(), loaded, "History loaded");
        self.history_file = Some(path);
        loaded
    }

    /// Require structured answers with these fields
    pub fn set_output_schema(&mut self, schema: Option<OutputSchema>) {
        self.output_schema = schema.filter(|s| !s.is_empty());
    }

    /// Register the completion callback, invoked once per `message` call
    pub fn on_message<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn history_file(&self) -> Option<&Path> {
        self.history_file.as_deref()
    }

    /// Send a message and run the loop until the model gives a final answer
    ///
    /// Input problems (unresolvable deferred parameter, missing or unsupported
    /// image) fail before anything is appended. Any other failure is persisted
    /// and returned as the answer text.
    pub async fn message(
        &mut self,
        text: &str,
        params: &dyn ParamSource,
        role: Role,
        images: &[String],
    ) -> Result<String> {
        let content = resolve_variables(text, params).await?;
        let message = Self::build_message(role, content, images).await?;
        self.conversation.append(message);

        let answer = match self.execute().await {
            Ok(answer) => {
                self.persist().await;
                answer
            }
            Err(e) => {
                warn!(error = %e, "Conversation turn failed");
                self.persist().await;
                if e.is_fatal() {
                    return Err(e);
                }
                e.to_string()
            }
        };

        if let Some(callback) = self.callback.as_mut() {
            callback(&answer);
        }
        Ok(answer)
    }

    async fn build_message(role: Role, content: String, images: &[String]) -> Result<Message> {
        if !images.is_empty() && role != Role::User {
            return Err(ParleyError::input(
                "Images can only be attached to user messages",
            ));
        }

        let mut parts = vec![ContentPart::text(content)];
        parts.extend(attachments::load_images(images).await?);

        match role {
            Role::User => Ok(Message::User { content: parts }),
            Role::System => Ok(Message::System { content: parts }),
            Role::Assistant => Ok(Message::Assistant {
                content: parts,
                structured: None,
            }),
            other => Err(ParleyError::input(format!(
                "Cannot send a message with role '{}'",
                other
            ))),
        }
    }

    /// The execution loop
    async fn execute(&mut self) -> Result<String> {
        let definitions: Vec<ToolDefinition> = self.tools.definitions();
        let mut state = AgentLoopState::new(self.config.max_iterations);

        loop {
            let iteration = state.begin_iteration()?;
            let prompt = self.build_prompt();
            debug!(
                iteration,
                messages = prompt.len(),
                tools = definitions.len(),
                "Invoking model"
            );

            let request = ChatRequest::new(&prompt)
                .with_tools(&definitions)
                .with_output_schema(self.output_schema.as_ref());

            let response = with_timeout(
                self.config.request_timeout_secs,
                "Model request",
                self.provider.invoke(request),
            )
            .await?;

            match response.into_outcome() {
                ModelResponse::Final(text) => {
                    info!(
                        iterations = state.iteration,
                        tool_calls = state.tool_calls,
                        "Conversation turn complete"
                    );
                    return self.finish(text);
                }
                ModelResponse::ToolCalls(calls) => {
                    debug!(iteration, count = calls.len(), "Model requested tools");
                    self.conversation.append(Message::tool_calls(calls.clone()));

                    for call in &calls {
                        let result = self.dispatch(call).await;
                        self.conversation
                            .append(Message::tool_result(&call.id, &call.name, result));
                    }
                    state.record_tool_calls(calls.len());
                }
            }
        }
    }

    /// Prompt in model order, with format instructions when a schema is set
    fn build_prompt(&self) -> Vec<Message> {
        let mut prompt = self.conversation.snapshot();

        if let Some(schema) = &self.output_schema {
            let instructions = ContentPart::text(schema.format_instructions());
            let last_system = prompt.iter().rposition(Message::is_system);
            match last_system.and_then(|idx| prompt.get_mut(idx)) {
                Some(Message::System { content }) => content.push(instructions),
                _ => prompt.insert(
                    0,
                    Message::System {
                        content: vec![instructions],
                    },
                ),
            }
        }

        prompt
    }

    /// Run one tool call; failures become an error result for the model
    async fn dispatch(&self, call: &ToolCallRequest) -> Vec<ContentPart> {
        debug!(tool = %call.name, id = %call.id, "Dispatching tool call");

        let outcome = with_timeout(
            self.config.tool_timeout_secs,
            &format!("Tool '{}'", call.name),
            self.tools.invoke(&call.name, call.arguments.clone()),
        )
        .await;

        match outcome {
            Ok(parts) => parts,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                vec![ContentPart::text(format!("Error: {}", e))]
            }
        }
    }

    /// Append the final answer and render it for the caller
    fn finish(&mut self, text: String) -> Result<String> {
        match &self.output_schema {
            Some(schema) => {
                let value = schema.parse(&text)?;
                let rendered = serde_json::to_string(&value)?;
                self.conversation
                    .append(Message::assistant_structured(rendered.clone(), value));
                Ok(rendered)
            }
            None => {
                self.conversation.append(Message::assistant(text.clone()));
                Ok(text)
            }
        }
    }

    /// Flush history; failures are logged and otherwise ignored
    async fn persist(&self) {
        let Some(path) = &self.history_file else {
            return;
        };
        if let Err(e) = history::persist(self.conversation.all(), path).await {
            warn!(path = %path.display(), error = %e, "Failed to persist history");
        }
    }
}

/// Bound a future by `secs` seconds; 0 means no bound
async fn with_timeout<T, F>(secs: u64, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if secs == 0 {
        return future.await;
    }
    match tokio::time::timeout(Duration::from_secs(secs), future).await {
        Ok(result) => result,
        Err(_) => Err(ParleyError::Timeout(what.to_string(), secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMResponse, MockProvider};
    use crate::tools::ToolContext;
    use serde_json::json;
    use std::collections::HashMap;

    fn agent(mock: &MockProvider, config: AgentConfig) -> Agent {
        let tools = ToolRegistry::new(ToolContext::new("/tmp"));
        Agent::new(Arc::new(mock.clone()), Arc::new(tools), config)
    }

    fn no_params() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_prompt_puts_format_instructions_in_system() {
        let mock = MockProvider::new(vec![LLMResponse::text("{\"answer\": \"4\"}")]);
        let mut agent = agent(&mock, AgentConfig::default());
        agent.instructions("Be brief", &no_params()).await.unwrap();
        agent.set_output_schema(Some(OutputSchema::new([("answer", "the result")])));

        let answer = agent
            .message("2+2?", &no_params(), Role::User, &[])
            .await
            .unwrap();
        assert_eq!(answer, "{\"answer\":\"4\"}");

        let sent = &mock.requests()[0];
        assert!(sent.had_output_schema);
        match &sent.messages[0] {
            Message::System { content } => {
                assert_eq!(content.len(), 2);
                assert!(content[1].as_text().unwrap().contains("\"answer\": string"));
            }
            other => panic!("expected system message, got {:?}", other),
        }
        // the store itself is untouched
        assert_eq!(agent.conversation().all()[0], Message::system("Be brief"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let mock = MockProvider::new(vec![
            LLMResponse::with_tool_calls(vec![ToolCallRequest::new("c1", "teleport", json!({}))]),
            LLMResponse::text("sorry"),
        ]);
        let mut agent = agent(&mock, AgentConfig::default());

        let answer = agent.message("go", &no_params(), Role::User, &[]).await.unwrap();
        assert_eq!(answer, "sorry");

        let log = agent.conversation().all();
        assert_eq!(log[2].text(), "Error: Unknown tool: teleport");
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_iteration_limit_is_reported_as_answer() {
        let call = || LLMResponse::with_tool_calls(vec![ToolCallRequest::new("c", "noop", json!({}))]);
        let mock = MockProvider::new(vec![call(), call(), call()]);
        let config = AgentConfig {
            max_iterations: 2,
            ..AgentConfig::default()
        };
        let mut agent = agent(&mock, config);

        let answer = agent.message("loop", &no_params(), Role::User, &[]).await.unwrap();
        assert_eq!(
            answer,
            "Reached the limit of 2 model invocations without a final answer"
        );
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_images_only_on_user_messages() {
        let mock = MockProvider::default();
        let mut agent = agent(&mock, AgentConfig::default());

        let err = agent
            .message("hi", &no_params(), Role::System, &["a.png".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(agent.conversation().is_empty());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_callback_invoked_once() {
        let mock = MockProvider::new(vec![LLMResponse::text("done")]);
        let mut agent = agent(&mock, AgentConfig::default());

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        agent.on_message(move |answer| sink.lock().unwrap().push(answer.to_string()));

        agent.message("x", &no_params(), Role::User, &[]).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["done".to_string()]);
    }
}
