//! `ask` command
//!
//! Builds an agent for one question: template parameters from the command
//! line, optional instructions, history and output schema, then runs the
//! conversation and hands the answer to a callback.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::agent::attachments::split_image_list;
use crate::agent::{Agent, Params};
use crate::core::{Config, ParleyError, Result, Role};
use crate::llm::{LLMProvider, OutputSchema};
use crate::tools::{load_tools, McpSession, ToolContext};

/// Options of a single `ask` invocation
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    pub role: Option<Role>,
    pub instructions: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub output_schema: Option<PathBuf>,
    /// Comma-separated image paths
    pub image: Option<String>,
    /// Content read from stdin, placed before the question
    pub context: Option<String>,
    /// Raw `--model` JSON, exposed to templates as `{model}`
    pub model: Option<String>,
    /// `key=value` or `key=@file` assignments
    pub params: Vec<String>,
}

impl AskOptions {
    /// Template parameters: the named options plus every `--param`
    pub fn template_params(&self) -> Result<Params> {
        let mut params = Params::new();
        params
            .set("question", self.question.clone())
            .set("role", self.role.unwrap_or(Role::User).to_string())
            .set_opt("history", self.history.as_ref().map(|p| p.display().to_string()))
            .set_opt(
                "instructions",
                self.instructions.as_ref().map(|p| p.display().to_string()),
            )
            .set_opt(
                "outputSchema",
                self.output_schema.as_ref().map(|p| p.display().to_string()),
            )
            .set_opt("image", self.image.clone())
            .set_opt("context", self.context.clone())
            .set_opt("model", self.model.clone());

        for assignment in &self.params {
            params.insert_assignment(assignment)?;
        }
        Ok(params)
    }

    /// The message actually sent, with any stdin context framed before it
    pub fn message_text(&self) -> String {
        match self.context.as_deref() {
            Some(context) if !context.is_empty() => {
                format!("---\n{}\n---\n{}", context, self.question)
            }
            _ => self.question.clone(),
        }
    }
}

/// Read all of stdin
pub async fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    tokio::io::stdin().read_to_string(&mut buffer).await?;
    Ok(buffer)
}

/// Run one `ask` conversation and return the answer
///
/// MCP servers started for the conversation are stopped before returning.
pub async fn run_ask<F>(
    options: AskOptions,
    config: &Config,
    provider: Arc<dyn LLMProvider>,
    on_answer: F,
) -> Result<String>
where
    F: FnMut(&str) + Send + 'static,
{
    let params = options.template_params()?;

    let context = ToolContext::current_dir()?.with_read_roots(config.tools.read_roots.clone());
    let (tools, mcp) = load_tools(context, &config.tools).await;
    debug!(
        provider = provider.name(),
        model = provider.model(),
        tools = tools.len(),
        mcp_servers = mcp.as_ref().map_or(0, McpSession::len),
        "Starting conversation"
    );

    let mut agent = Agent::new(provider, Arc::new(tools), config.agent.clone());
    agent.on_message(on_answer);

    let answer = converse(&mut agent, &options, &params).await;

    if let Some(session) = mcp {
        session.shutdown().await;
    }
    answer
}

async fn converse(agent: &mut Agent, options: &AskOptions, params: &Params) -> Result<String> {
    if let Some(path) = &options.instructions {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ParleyError::input(format!(
                "Cannot read instructions {}: {}",
                path.display(),
                e
            ))
        })?;
        agent.instructions(&text, params).await?;
    }

    if let Some(path) = &options.history {
        agent.load_history(path.clone()).await;
    }

    if let Some(path) = &options.output_schema {
        agent.set_output_schema(OutputSchema::load(path).await);
    }

    let images = options
        .image
        .as_deref()
        .map(split_image_list)
        .unwrap_or_default();

    agent
        .message(
            &options.message_text(),
            params,
            options.role.unwrap_or(Role::User),
            &images,
        )
        .await
}
