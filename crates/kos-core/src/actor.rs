//! Actor identity for audited administrative actions.
//!
//! An [`Actor`] is derived from the caller's access token claims when a
//! human operator performs an action, or is the [`Actor::system`] sentinel
//! for non-interactive writers such as the Keycloak sync job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Keycloak id recorded for actions performed by the system itself.
pub const SYSTEM_ACTOR_ID: &str = "SYSTEM";

/// The identity that performed an administrative action.
///
/// # Examples
///
/// ```rust
/// use kos_core::Actor;
/// use serde_json::json;
///
/// let claims = json!({
///     "sub": "f7d2c9e0",
///     "email": "ops@example.com",
///     "preferred_username": "ops",
///     "iss": "https://sso.example.com/realms/master"
/// });
///
/// let actor = Actor::from_claims(&claims).unwrap();
/// assert_eq!(actor.keycloak_id, "f7d2c9e0");
/// assert_eq!(actor.display_name.as_deref(), Some("ops"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Subject of the actor's token in the identity provider.
    pub keycloak_id: String,

    /// Email claim, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Human-readable name (`name`, falling back to `preferred_username`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Token issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Actor {
    /// Creates an actor with only a Keycloak id.
    #[must_use]
    pub fn new(keycloak_id: impl Into<String>) -> Self {
        Self {
            keycloak_id: keycloak_id.into(),
            email: None,
            display_name: None,
            issuer: None,
        }
    }

    /// The sentinel actor used for non-interactive writers.
    #[must_use]
    pub fn system() -> Self {
        Self {
            keycloak_id: SYSTEM_ACTOR_ID.to_string(),
            email: None,
            display_name: Some("System".to_string()),
            issuer: None,
        }
    }

    /// Derives an actor from decoded access token claims.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the claims carry no `sub`.
    pub fn from_claims(claims: &Value) -> Result<Self> {
        let claim = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_string);

        let keycloak_id = claim("sub").ok_or_else(|| CoreError::InvalidInput {
            reason: "token claims have no subject".to_string(),
        })?;

        Ok(Self {
            keycloak_id,
            email: claim("email"),
            display_name: claim("name").or_else(|| claim("preferred_username")),
            issuer: claim("iss"),
        })
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Returns true for the system sentinel.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.keycloak_id == SYSTEM_ACTOR_ID
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.display_name, &self.email) {
            (Some(name), _) => write!(f, "{name} ({})", self.keycloak_id),
            (None, Some(email)) => write!(f, "{email} ({})", self.keycloak_id),
            (None, None) => f.write_str(&self.keycloak_id),
        }
    }
}
