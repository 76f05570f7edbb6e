//! Agent loop state management
//!
//! Tracks model invocations for one `message` call and enforces the
//! iteration guard.

use crate::core::{ParleyError, Result};

/// State of the execution loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Model invocations made so far
    pub iteration: usize,
    /// Maximum allowed invocations (0 = unbounded)
    pub max_iterations: usize,
    /// Tool calls dispatched so far
    pub tool_calls: usize,
}

impl AgentLoopState {
    /// Create a new loop state with the given bound
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            tool_calls: 0,
        }
    }

    /// Claim the next model invocation, failing once the bound is reached
    pub fn begin_iteration(&mut self) -> Result<usize> {
        if self.max_iterations > 0 && self.iteration >= self.max_iterations {
            return Err(ParleyError::IterationLimit(self.max_iterations));
        }
        self.iteration += 1;
        Ok(self.iteration)
    }

    /// Record a dispatched batch of tool calls
    pub fn record_tool_calls(&mut self, count: usize) {
        self.tool_calls += count;
    }
}
