//! Kinds of administrative actions and the entities they act on.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Type of mutation recorded in the action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    /// The entity was created.
    Create,
    /// The entity's mutable fields were changed.
    Update,
    /// The entity was deleted.
    Delete,
}

impl ActionType {
    /// Returns the action that undoes this one.
    ///
    /// Creates and deletes invert each other; an update is undone by another
    /// update.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Create => Self::Delete,
            Self::Delete => Self::Create,
            Self::Update => Self::Update,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(CoreError::UnknownVariant {
                kind: "action type",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of entity an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    /// OIDC/SAML client.
    Client,
    /// Realm or client role.
    Role,
    /// Group.
    Group,
    /// Identity provider link.
    Idp,
    /// Realm.
    Realm,
    /// End user.
    User,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Client,
        Self::Role,
        Self::Group,
        Self::Idp,
        Self::Realm,
        Self::User,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Role => "ROLE",
            Self::Group => "GROUP",
            Self::Idp => "IDP",
            Self::Realm => "REALM",
            Self::User => "USER",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "entity type",
                value: s.to_string(),
            })
    }
}
