//! Shared error taxonomy.
//!
//! Every crate boundary in this workspace returns `AlertError` (or wraps one
//! via `#[from]`). Each variant maps to exactly one tag from the error
//! taxonomy; the HTTP layer converts on `ErrorTag`, never on variant name.

use thiserror::Error;

/// One of the eight propagation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    Validation,
    NotFound,
    Conflict,
    Timeout,
    Unavailable,
    QueueFull,
    Permanent,
    Internal,
}

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("queue full: {0}")]
    QueueFull(String),

    #[error("permanent downstream failure: {0}")]
    Permanent(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AlertError {
    pub fn tag(&self) -> ErrorTag {
        match self {
            AlertError::Validation(_) => ErrorTag::Validation,
            AlertError::NotFound(_) => ErrorTag::NotFound,
            AlertError::Conflict(_) => ErrorTag::Conflict,
            AlertError::Timeout(_) => ErrorTag::Timeout,
            AlertError::Unavailable(_) => ErrorTag::Unavailable,
            AlertError::QueueFull(_) => ErrorTag::QueueFull,
            AlertError::Permanent(_) => ErrorTag::Permanent,
            AlertError::Internal(_) => ErrorTag::Internal,
            AlertError::Serialization(_) => ErrorTag::Internal,
        }
    }

    /// Whether a publishing job failing with this error should be retried.
    pub fn is_transient_for_jobs(&self) -> bool {
        matches!(
            self.tag(),
            ErrorTag::Timeout | ErrorTag::Unavailable | ErrorTag::Internal
        )
    }
}

pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_is_not_transient() {
        let e = AlertError::Permanent("404 from target".into());
        assert!(!e.is_transient_for_jobs());
        assert_eq!(e.tag(), ErrorTag::Permanent);
    }

    #[test]
    fn timeout_is_transient() {
        let e = AlertError::Timeout("classify deadline".into());
        assert!(e.is_transient_for_jobs());
    }
}
