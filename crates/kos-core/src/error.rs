//! Error types for Kos core operations.

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in Kos core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An enum value could not be parsed from its wire name.
    #[error("Unknown {kind}: {value}")]
    UnknownVariant {
        /// Which enum was being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid input provided.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Reason the input is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_variant() {
        let err = CoreError::UnknownVariant {
            kind: "entity type",
            value: "TENANT".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown entity type: TENANT");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = CoreError::InvalidInput {
            reason: "token has no subject".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid input: token has no subject");
    }
}
