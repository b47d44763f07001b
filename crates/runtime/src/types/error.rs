//! Error types for the deliberation runtime.
//!
//! Every subsystem exposes its own error enum; `RuntimeError` is the
//! umbrella returned at the service boundary.

use thiserror::Error;

use super::{SessionId, WorkflowStatus};

/// Top-level runtime error returned by boundary operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Operation not allowed while session is {status}: {reason}")]
    WrongStatus {
        status: WorkflowStatus,
        reason: String,
    },

    #[error("Workflow already running for session {0}")]
    AlreadyRunning(SessionId),

    #[error("Deliverables not available: {0}")]
    NotAvailable(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Node {node} failed: {message}")]
    Node { node: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the runtime.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Failures surfaced by the LLM gateway.
///
/// `Safety` is never retried; the other kinds are retried with exponential
/// backoff up to the configured attempt budget.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Safety violation: {0}")]
    Safety(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl LlmError {
    /// Whether the gateway may retry after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Safety(_))
    }
}

/// Classification of tool execution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Caller passed parameters the tool cannot accept. Not retried.
    InvalidParameter,
    /// Caller requested an operation the tool does not implement. Not retried.
    InvalidOperation,
    /// The per-call deadline elapsed. Retried.
    Timeout,
    /// The tool ran but failed. Retried.
    Execution,
}

impl ToolErrorKind {
    /// Contract errors are the caller's fault; retrying cannot help.
    pub fn is_transient(&self) -> bool {
        matches!(self, ToolErrorKind::Timeout | ToolErrorKind::Execution)
    }
}

/// A tool execution failure. Folded into `ToolResult` by the registry;
/// never raised across the kernel boundary.
#[derive(Error, Debug, Clone, serde::Serialize, serde::Deserialize)]
#[error("{kind:?}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParameter, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidOperation, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Errors produced by the state store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Session not found: {0}")]
    NotFound(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_errors_are_not_retryable() {
        assert!(!LlmError::Safety("banner leak".into()).is_retryable());
        assert!(LlmError::RateLimit("429".into()).is_retryable());
        assert!(LlmError::Timeout("deadline".into()).is_retryable());
        assert!(LlmError::Provider("boom".into()).is_retryable());
    }

    #[test]
    fn contract_errors_are_not_transient() {
        assert!(!ToolErrorKind::InvalidParameter.is_transient());
        assert!(!ToolErrorKind::InvalidOperation.is_transient());
        assert!(ToolErrorKind::Timeout.is_transient());
        assert!(ToolErrorKind::Execution.is_transient());
    }

    #[test]
    fn store_not_found_converts_to_runtime_error() {
        let id = SessionId::new();
        let err: RuntimeError = StoreError::NotFound(id).into();
        assert!(matches!(err, RuntimeError::Store(StoreError::NotFound(_))));
    }
}
