//! JSON representations exchanged with the Keycloak admin API.
//!
//! Only the fields Kos reads or writes are modelled; unknown fields in
//! responses are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

fn default_protocol() -> String {
    "openid-connect".to_string()
}

/// A Keycloak client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    /// Keycloak-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// OAuth client id.
    pub client_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the client is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the client is public (no secret).
    #[serde(default)]
    pub public_client: bool,
    /// Protocol, normally `openid-connect`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Root URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    /// Base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Allowed redirect URIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    /// Allowed CORS origins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_origins: Option<Vec<String>>,
    /// Authorization code flow.
    #[serde(default = "default_true")]
    pub standard_flow_enabled: bool,
    /// Resource owner password grant.
    #[serde(default)]
    pub direct_access_grants_enabled: bool,
    /// Service account (client credentials grant).
    #[serde(default)]
    pub service_accounts_enabled: bool,
}

impl ClientRepresentation {
    /// Creates an enabled confidential client with Keycloak's defaults.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            id: None,
            client_id: client_id.into(),
            name: None,
            description: None,
            enabled: true,
            public_client: false,
            protocol: default_protocol(),
            root_url: None,
            base_url: None,
            redirect_uris: None,
            web_origins: None,
            standard_flow_enabled: true,
            direct_access_grants_enabled: false,
            service_accounts_enabled: false,
        }
    }
}

/// A realm or client role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    /// Keycloak-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Role name, unique within its container.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the role aggregates other roles.
    #[serde(default)]
    pub composite: bool,
    /// Whether the role belongs to a client.
    #[serde(default)]
    pub client_role: bool,
    /// Id of the realm or client that owns the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

impl RoleRepresentation {
    /// Creates a role with a name and optional description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
            composite: false,
            client_role: false,
            container_id: None,
        }
    }
}

/// A group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRepresentation {
    /// Keycloak-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Group name.
    pub name: String,
    /// Full path, e.g. `/engineering`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Multi-valued attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Vec<String>>>,
    /// Child groups, when the server includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_groups: Option<Vec<GroupRepresentation>>,
}

impl GroupRepresentation {
    /// Creates a top-level group, with path `/{name}`.
    #[must_use]
    pub fn top_level(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: None,
            path: Some(format!("/{name}")),
            name,
            attributes: None,
            sub_groups: None,
        }
    }
}

/// Response of the OpenID Connect token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Token type, normally `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}
