//! Errors raised by the audit log.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur while writing or reading the action log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The referenced action does not exist.
    #[error("Action {id} not found")]
    NotFound {
        /// Action id.
        id: Uuid,
    },

    /// The action already carries a revert annotation.
    #[error("Action {id} has already been reverted")]
    AlreadyReverted {
        /// Action id.
        id: Uuid,
    },

    /// Failed to serialize or parse a persisted log.
    #[error("Failed to serialize action log: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O error in a file-backed store.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure.
    #[error("Action log store error: {0}")]
    Store(String),
}
