//! Error types for Keycloak admin operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Keycloak operations.
pub type Result<T> = std::result::Result<T, KeycloakError>;

/// Errors that can occur while talking to the Keycloak admin API.
#[derive(Debug, Error)]
pub enum KeycloakError {
    /// Failed to connect to Keycloak.
    #[error("Failed to connect to Keycloak at {url}: {source}")]
    ConnectionFailed {
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Token acquisition failed or the token was rejected (401/403).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// The addressed resource does not exist (404).
    #[error("Keycloak resource not found: {resource}")]
    NotFound {
        /// Resource description.
        resource: String,
    },

    /// The resource conflicts with existing state (409).
    #[error("Keycloak resource conflict: {resource}")]
    Conflict {
        /// Resource description.
        resource: String,
    },

    /// Any other non-success status.
    #[error("HTTP error from Keycloak: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Response body or error text.
        message: String,
    },

    /// A create call succeeded without a usable `Location` header.
    #[error("Keycloak did not return the location of the created {resource}")]
    MissingLocation {
        /// Resource description.
        resource: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// TLS material could not be loaded.
    #[error("Invalid TLS configuration: {message}")]
    InvalidTls {
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl KeycloakError {
    /// Returns the HTTP status this error corresponds to, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::HttpError { status, .. } if *status != 0 => Some(*status),
            _ => None,
        }
    }

    /// Returns true for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for KeycloakError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else {
            Self::HttpError {
                status: err.status().map_or(0, |s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for KeycloakError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}
