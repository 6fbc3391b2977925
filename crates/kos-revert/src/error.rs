//! Error types for the revert engine.
//!
//! Rejections are raised before anything is changed. `External` means the
//! identity provider refused a compensating call and nothing local was
//! written. `Diverged` means the identity provider was changed but a later
//! local or audit write failed, so the two sides disagree.

use kos_core::EntityType;
use kos_keycloak::KeycloakError;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for revert operations.
pub type Result<T> = std::result::Result<T, RevertError>;

/// Errors that can occur while reverting an action.
#[derive(Error, Debug)]
pub enum RevertError {
    /// The action, or a row the compensation needs, does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The action has already been reverted.
    #[error("action {action_id} already reverted")]
    AlreadyReverted {
        /// Action id.
        action_id: Uuid,
    },

    /// A later, unreverted action on the same entity blocks the revert.
    #[error("cannot revert action {action_id}: subsequent actions exist on this entity")]
    Conflict {
        /// Action id.
        action_id: Uuid,
    },

    /// Actions on this kind of entity are never reverted.
    #[error("{entity_type} actions cannot be reverted: {reason}")]
    NotRevertible {
        /// Entity kind.
        entity_type: EntityType,
        /// Why.
        reason: &'static str,
    },

    /// No compensation exists yet for this kind of entity.
    #[error("revert of {entity_type} actions is not implemented")]
    NotImplemented {
        /// Entity kind.
        entity_type: EntityType,
    },

    /// The record lacks data the compensation needs.
    #[error("action {action_id} cannot be reverted: {reason}")]
    InvalidRecord {
        /// Action id.
        action_id: Uuid,
        /// What is missing or malformed.
        reason: String,
    },

    /// The identity provider rejected a compensating call.
    #[error("identity provider call failed while reverting action {action_id}: {source}")]
    External {
        /// Action id.
        action_id: Uuid,
        /// Underlying error.
        #[source]
        source: KeycloakError,
    },

    /// The identity provider was changed but a later write failed.
    #[error("revert of action {action_id} diverged during {stage}: {message}")]
    Diverged {
        /// Action id.
        action_id: Uuid,
        /// Step that failed after the identity provider changed.
        stage: &'static str,
        /// Failure detail.
        message: String,
    },

    /// Any other failure before the identity provider was changed.
    #[error("failed to revert action {action_id}: {message}")]
    Internal {
        /// Action id.
        action_id: Uuid,
        /// Failure detail.
        message: String,
    },
}

impl RevertError {
    /// Returns the HTTP status class of the error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::AlreadyReverted { .. }
            | Self::NotRevertible { .. }
            | Self::InvalidRecord { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::NotImplemented { .. } => 501,
            Self::External { .. } | Self::Diverged { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Returns true for typed refusals raised before any change was made.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        self.status_code() < 500 || matches!(self, Self::NotImplemented { .. })
    }

    /// Returns true if the identity provider and the local store may disagree.
    #[must_use]
    pub const fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::nil();
        assert_eq!(
            RevertError::NotFound {
                what: "action".to_string()
            }
            .status_code(),
            404
        );
        assert_eq!(RevertError::AlreadyReverted { action_id: id }.status_code(), 400);
        assert_eq!(RevertError::Conflict { action_id: id }.status_code(), 409);
        assert_eq!(
            RevertError::NotImplemented {
                entity_type: EntityType::Idp
            }
            .status_code(),
            501
        );
        assert_eq!(
            RevertError::Internal {
                action_id: id,
                message: "boom".to_string()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_rejections() {
        let id = Uuid::nil();
        assert!(RevertError::Conflict { action_id: id }.is_rejection());
        assert!(RevertError::NotImplemented {
            entity_type: EntityType::Idp
        }
        .is_rejection());
        assert!(!RevertError::Diverged {
            action_id: id,
            stage: "local projection",
            message: "disk full".to_string()
        }
        .is_rejection());
    }

    #[test]
    fn test_display_mentions_reason() {
        let err = RevertError::AlreadyReverted {
            action_id: Uuid::nil(),
        };
        assert!(err.to_string().contains("already reverted"));

        let err = RevertError::Conflict {
            action_id: Uuid::nil(),
        };
        assert!(err.to_string().contains("subsequent actions exist"));

        let err = RevertError::NotRevertible {
            entity_type: EntityType::Realm,
            reason: "realm actions are out of scope",
        };
        assert_eq!(
            err.to_string(),
            "REALM actions cannot be reverted: realm actions are out of scope"
        );
    }
}
