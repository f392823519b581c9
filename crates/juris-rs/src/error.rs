//! Error taxonomy for the question-answering pipeline.
//!
//! [`GenerateError`] is what the text-generation and chat ports return; it
//! only distinguishes retryable from non-retryable failures. [`QueryError`]
//! is what every pipeline stage and the agent surface to callers.

use serde::Serialize;

/// Failure reported by a generation port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// Network failure, rate limiting or a 5xx response. Safe to retry.
    #[error("transient upstream failure: {0}")]
    Transient(String),
    /// The provider rejected the request or returned something unusable.
    #[error("generation failed: {0}")]
    Content(String),
}

impl GenerateError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Machine-readable category of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decomposition,
    UnknownTool,
    ToolInvocation,
    MaxIterations,
    UpstreamService,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decomposition => "decomposition",
            Self::UnknownTool => "unknown_tool",
            Self::ToolInvocation => "tool_invocation",
            Self::MaxIterations => "max_iterations",
            Self::UpstreamService => "upstream_service",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while answering a query or setting up a session.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The decomposer could not produce a usable list of sub-questions.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// A sub-question or tool call named a tool that is not registered.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// A document tool failed while answering its sub-question.
    #[error("tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// The agent did not reach a final answer within its iteration budget.
    #[error("no final answer after {limit} iterations")]
    MaxIterations { limit: u32 },

    /// The language-model provider failed after the retry budget was spent.
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// Invalid template, index directory or session wiring.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl QueryError {
    pub fn decomposition(message: impl Into<String>) -> Self {
        Self::Decomposition(message.into())
    }

    pub fn tool_invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decomposition(_) => ErrorKind::Decomposition,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::ToolInvocation { .. } => ErrorKind::ToolInvocation,
            Self::MaxIterations { .. } => ErrorKind::MaxIterations,
            Self::Upstream(_) => ErrorKind::UpstreamService,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl From<GenerateError> for QueryError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Transient(message) | GenerateError::Content(message) => {
                Self::Upstream(message)
            }
        }
    }
}
