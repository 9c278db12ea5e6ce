use thiserror::Error;

/// Result type alias for Scout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the orchestration core
#[derive(Error, Debug)]
pub enum Error {
    /// Target asset or job does not exist
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the resource that wasn't found
        resource: String,
    },

    /// Intrusive provider requested against an unverified target
    #[error("ownership verification required for target: {target}")]
    VerificationRequired {
        /// The unverified target
        target: String,
    },

    /// No queue is configured for the requested provider
    #[error("unknown provider: {provider}")]
    UnknownProvider {
        /// The provider name as submitted
        provider: String,
    },

    /// Insert collided with an existing document
    #[error("conflict: {0}")]
    Conflict(String),

    /// Job lifecycle state machine violation
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        /// Job whose transition was rejected
        job_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Executor signalled a failure worth retrying
    #[error("transient executor failure: {0}")]
    TransientExecutor(String),

    /// Executor failed permanently or retries were exhausted
    #[error("terminal executor failure: {0}")]
    TerminalExecutor(String),

    /// The store does not support change streams in this deployment
    #[error("change stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Storage-level failure
    #[error("store error: {0}")]
    Store(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error is retryable under a queue's retry policy
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientExecutor(_))
    }

    /// Returns the HTTP-class status code for synchronous admission errors
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::VerificationRequired { .. } => Some(403),
            Self::UnknownProvider { .. } => Some(400),
            Self::Conflict(_) => Some(409),
            _ => None,
        }
    }

    /// Shorthand for a [`Error::NotFound`] with a formatted resource
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::TransientExecutor("timeout".into()).is_retryable());
        assert!(!Error::TerminalExecutor("bad input".into()).is_retryable());
        assert!(!Error::not_found("asset x").is_retryable());
    }

    #[test]
    fn test_status_codes() {
        let gated = Error::VerificationRequired {
            target: "example.com".into(),
        };
        assert_eq!(gated.status_code(), Some(403));
        assert_eq!(Error::not_found("job 1").status_code(), Some(404));
        assert_eq!(
            Error::UnknownProvider {
                provider: "nmap".into()
            }
            .status_code(),
            Some(400)
        );
        assert_eq!(Error::Internal("boom".into()).status_code(), None);
    }
}
