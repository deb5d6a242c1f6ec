//! Errors for the storage trait abstractions (`ConfigStore`, `DlqStore`,
//! `LockManager`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("config version not found: {version}")]
    VersionNotFound { version: u64 },

    #[error("dlq entry not found: {id}")]
    DlqEntryNotFound { id: String },

    #[error("dlq entry already replayed: {id}")]
    AlreadyReplayed { id: String },

    #[error("lock held by another holder: {key}")]
    LockConflict { key: String },

    #[error("lock not held: {key}")]
    LockNotHeld { key: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StorageError> for alert_types::AlertError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionNotFound { .. } | StorageError::DlqEntryNotFound { .. } => {
                alert_types::AlertError::NotFound(err.to_string())
            }
            StorageError::AlreadyReplayed { .. } | StorageError::LockConflict { .. } => {
                alert_types::AlertError::Conflict(err.to_string())
            }
            StorageError::LockNotHeld { .. } => alert_types::AlertError::Internal(err.to_string()),
            StorageError::Backend(_) | StorageError::Serialization(_) => {
                alert_types::AlertError::Internal(err.to_string())
            }
        }
    }
}
