//! CLI module - command handlers
//!
//! Argument parsing lives in the binary; these handlers do the work.

pub mod ask;
pub mod history;

pub use ask::{read_stdin, run_ask, AskOptions};
pub use history::render_history;
