//! Error types for SQLFlow.
//!
//! Defines the main error enum used throughout the application.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Main error type for SQLFlow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlFlowError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (auth, provider failures, malformed responses, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// A database or LLM call exceeded its time bound.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration errors (missing API key, missing connection, invalid config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A prompt template was rendered without one of its fields.
    #[error("Template error: {0}")]
    Template(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlFlowError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a template error with the given message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Timeout(_) => "Timeout Error",
            Self::Config(_) => "Configuration Error",
            Self::Template(_) => "Template Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for failures caused by the outside world during a chat turn.
    ///
    /// These are narrated back to the user. Everything else is either a
    /// configuration problem that blocks the turn up front or a defect.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Query(_) | Self::Llm(_) | Self::Timeout(_)
        )
    }
}

/// Result type alias using SqlFlowError.
pub type Result<T> = std::result::Result<T, SqlFlowError>;

/// Awaits `fut`, failing with a `Timeout` error once `limit` has passed.
///
/// `what` names the operation in the message, e.g. "Query timed out after 30 seconds".
pub async fn bounded<T>(
    limit: Duration,
    what: impl Into<String>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        SqlFlowError::timeout(format!(
            "{} timed out after {} seconds",
            what.into(),
            limit.as_secs()
        ))
    })?
}
