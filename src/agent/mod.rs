//! Agent module - orchestration and conversation management
//!
//! Contains the execution loop that coordinates model calls and tool
//! execution, plus the conversation state it drives.

pub mod attachments;
pub mod conversation;
pub mod history;
pub mod loop_state;
pub mod orchestrator;
pub mod variables;

pub use conversation::Conversation;
pub use loop_state::AgentLoopState;
pub use orchestrator::Agent;
pub use variables::{resolve_variables, ParamSource, ParamValue, Params};
