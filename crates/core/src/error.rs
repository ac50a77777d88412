//! Core Error Types
//!
//! Defines the error taxonomy used across the CodeGauge workspace. Every
//! variant here is caught at the per-pass boundary by the orchestrator and
//! converted into a result; none of them crosses a pass boundary as an
//! exception.

use thiserror::Error;

/// Core error type for the CodeGauge workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The external assistant CLI failed its pre-flight health check
    #[error("Assistant unavailable: {0}")]
    ToolUnavailable(String),

    /// A child process exceeded its bounded wait and was forcibly terminated
    #[error("Process timed out after {0} seconds")]
    Timeout(u64),

    /// A child process completed but produced nothing usable on either stream
    #[error("Process produced no usable output: {0}")]
    EmptyOutput(String),

    /// No extraction strategy produced a parseable payload
    #[error("Unextractable payload: {0}")]
    Unextractable(String),

    /// Command execution errors (spawn failure, interrupted wait)
    #[error("Command error: {0}")]
    Command(String),

    /// Prompt construction errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a tool-unavailable error
    pub fn tool_unavailable(msg: impl Into<String>) -> Self {
        Self::ToolUnavailable(msg.into())
    }

    /// Create an empty-output error
    pub fn empty_output(msg: impl Into<String>) -> Self {
        Self::EmptyOutput(msg.into())
    }

    /// Create an unextractable-payload error
    pub fn unextractable(msg: impl Into<String>) -> Self {
        Self::Unextractable(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
