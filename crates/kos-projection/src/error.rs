//! Errors raised by the local projection.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Errors that can occur while reading or writing projection rows.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A row would violate a uniqueness constraint.
    #[error("{entity} '{key}' already exists")]
    Duplicate {
        /// Row kind.
        entity: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// Failed to serialize or parse a snapshot.
    #[error("Failed to serialize projection: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure.
    #[error("Projection store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_duplicate() {
        let err = ProjectionError::Duplicate {
            entity: "realm",
            key: "acme".to_string(),
        };
        assert_eq!(err.to_string(), "realm 'acme' already exists");
    }
}
