//! Parley - command-line LLM agent
//!
//! Turns a single request into a tool-augmented conversation with a language
//! model, persists the conversation, and returns the final answer.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with Ollama, OpenAI and Databricks backends
//! - **Tools**: Tool registry with confined file tools
//! - **Agent**: Execution loop, message store, variables and history
//! - **CLI**: Handlers for the `ask` and `history` commands
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use parley::core::{AgentConfig, ModelSpec, Role};
//! use parley::llm::create_provider;
//! use parley::tools::{ToolContext, ToolRegistry};
//! use parley::Agent;
//!
//! #[tokio::main]
//! async fn main() -> parley::Result<()> {
//!     let provider = create_provider(&ModelSpec::new("ollama"))?;
//!     let tools = ToolRegistry::new(ToolContext::current_dir()?);
//!     let mut agent = Agent::new(provider, Arc::new(tools), AgentConfig::default());
//!
//!     let params = HashMap::from([("x".to_string(), "2+2".to_string())]);
//!     let answer = agent.message("What is {x}?", &params, Role::User, &[]).await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::Agent;
pub use core::{Config, ParleyError, Result};
