//! Custom error types for Parley
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Parley operations
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Model provider connection or API errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model not available on the provider
    #[error("Model '{0}' not available on the provider")]
    ModelNotFound(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// A tool call named a capability that is not registered
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Tool arguments did not match the declared schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// A tool refused to touch a path outside its allowed roots
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Invalid caller input (missing image, unknown MIME type, unreadable file)
    #[error("{0}")]
    Input(String),

    /// The final answer did not match the requested output schema
    #[error("Output did not match schema: {0}")]
    Schema(String),

    /// MCP server transport or protocol errors
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model or tool call exceeded its time budget
    #[error("{0} timed out after {1}s")]
    Timeout(String, u64),

    /// The model kept requesting tools past the iteration guard
    #[error("Reached the limit of {0} model invocations without a final answer")]
    IterationLimit(usize),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Parley operations
pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create an invalid-arguments error
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create an access-denied error
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a schema mismatch error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create an MCP error
    pub fn mcp(msg: impl Into<String>) -> Self {
        Self::Mcp(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether this error must abort the run instead of being reported as an answer
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ParleyError::IterationLimit(3).to_string(),
            "Reached the limit of 3 model invocations without a final answer"
        );
        assert_eq!(
            ParleyError::invalid_arguments("readFile", "missing required field 'file'").to_string(),
            "Invalid arguments for tool 'readFile': missing required field 'file'"
        );
        assert_eq!(
            ParleyError::Timeout("Model request".into(), 30).to_string(),
            "Model request timed out after 30s"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ParleyError::input("Image file not found: x.png").is_fatal());
        assert!(ParleyError::config("Unknown model type: foo").is_fatal());
        assert!(!ParleyError::provider("boom").is_fatal());
        assert!(!ParleyError::schema("missing field").is_fatal());
    }
}
