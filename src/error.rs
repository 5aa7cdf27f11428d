//! Error types for interview-core.

use thiserror::Error;

/// Result type alias using interview-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an interview session.
#[derive(Error, Debug)]
pub enum Error {
    /// LLM or STT backend unreachable, out of quota, or timed out
    #[error("Backend unavailable: {provider} - {message}")]
    BackendUnavailable { provider: String, message: String },

    /// No session with the given id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Answer or check received for a question that is not current
    #[error("Invalid transition: expected question {expected}, got {got}")]
    InvalidTransition { expected: String, got: String },

    /// Snapshot or event-log write failed after retry
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Timeout during operation
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a backend-unavailable error.
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::InvalidTransition {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// True for errors the evaluation path must absorb with a fallback
    /// rather than surface to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = Error::backend("local", "connection refused");
        assert_eq!(
            err.to_string(),
            "Backend unavailable: local - connection refused"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_session_not_found_is_not_recoverable() {
        let err = Error::SessionNotFound("sess_1".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_timeout_is_recoverable() {
        assert!(Error::timeout(30_000).is_recoverable());
    }
}
