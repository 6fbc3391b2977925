//! Rows of the local projection of Keycloak state.
//!
//! The projection mirrors the entities held in Keycloak so that admin queries
//! do not need a round trip to the identity provider. Each row carries both
//! its stable local `id` and the `keycloak_id` Keycloak assigned to it; the
//! two are independent, and a revert that recreates an entity keeps the local
//! id while picking up a fresh Keycloak id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A realm known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KcRealm {
    /// Local identifier.
    pub id: Uuid,
    /// Realm name, unique within Keycloak.
    pub realm_name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    pub enabled: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl KcRealm {
    /// Creates an enabled realm row with a fresh local id.
    #[must_use]
    pub fn new(realm_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_name: realm_name.into(),
            display_name: None,
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

/// An OIDC client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KcClient {
    /// Local identifier.
    pub id: Uuid,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Public client identifier (`clientId` in Keycloak).
    pub client_id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the client is enabled.
    pub enabled: bool,
    /// Public (no secret) client.
    pub public_client: bool,
    /// Authorization code flow enabled.
    pub standard_flow_enabled: bool,
    /// Resource owner password grant enabled.
    pub direct_access_grants_enabled: bool,
    /// Service account enabled.
    pub service_accounts_enabled: bool,
    /// Protocol, usually `openid-connect`.
    pub protocol: String,
    /// Root URL.
    #[serde(default)]
    pub root_url: Option<String>,
    /// Base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Valid redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Allowed CORS origins.
    #[serde(default)]
    pub web_origins: Vec<String>,
    /// Id assigned by Keycloak.
    pub keycloak_id: String,
    /// Last time the row was reconciled with Keycloak.
    pub synced_at: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified locally.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl KcClient {
    /// Creates a client row with Keycloak's defaults for a new public client.
    #[must_use]
    pub fn new(
        id: Uuid,
        realm_id: Uuid,
        client_id: impl Into<String>,
        keycloak_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id,
            client_id: client_id.into(),
            name: None,
            description: None,
            enabled: true,
            public_client: true,
            standard_flow_enabled: true,
            direct_access_grants_enabled: false,
            service_accounts_enabled: false,
            protocol: "openid-connect".to_string(),
            root_url: None,
            base_url: None,
            redirect_uris: Vec::new(),
            web_origins: Vec::new(),
            keycloak_id: keycloak_id.into(),
            synced_at: now,
            created_at: now,
            updated_at: None,
        }
    }
}

/// A realm role or client role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KcRole {
    /// Local identifier.
    pub id: Uuid,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Local id of the owning client; `None` for realm roles.
    #[serde(default)]
    pub client_id: Option<Uuid>,
    /// Role name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the role is composite.
    pub composite: bool,
    /// Id assigned by Keycloak. For client roles this is
    /// `{clientKeycloakId}/{roleName}`.
    pub keycloak_id: String,
    /// Last time the row was reconciled with Keycloak.
    pub synced_at: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified locally.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl KcRole {
    /// Creates a non-composite role row.
    #[must_use]
    pub fn new(
        id: Uuid,
        realm_id: Uuid,
        client_id: Option<Uuid>,
        name: impl Into<String>,
        keycloak_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id,
            client_id,
            name: name.into(),
            description: None,
            composite: false,
            keycloak_id: keycloak_id.into(),
            synced_at: now,
            created_at: now,
            updated_at: None,
        }
    }

    /// Returns true if the role belongs to a client.
    #[must_use]
    pub const fn is_client_role(&self) -> bool {
        self.client_id.is_some()
    }
}

/// A group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KcGroup {
    /// Local identifier.
    pub id: Uuid,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Parent group; `None` for top-level groups.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Group name.
    pub name: String,
    /// Full path, e.g. `/engineering/platform`.
    pub path: String,
    /// Group attributes.
    #[serde(default)]
    pub attributes: serde_json::Value,
    /// Id assigned by Keycloak.
    pub keycloak_id: String,
    /// Last time the row was reconciled with Keycloak.
    pub synced_at: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified locally.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl KcGroup {
    /// Creates a top-level group row with path `/{name}`.
    #[must_use]
    pub fn top_level(
        id: Uuid,
        realm_id: Uuid,
        name: impl Into<String>,
        keycloak_id: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id,
            realm_id,
            parent_id: None,
            path: format!("/{name}"),
            name,
            attributes: serde_json::Value::Object(serde_json::Map::new()),
            keycloak_id: keycloak_id.into(),
            synced_at: now,
            created_at: now,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_group_path() {
        let group = KcGroup::top_level(Uuid::now_v7(), Uuid::now_v7(), "engineering", "kc-1");
        assert_eq!(group.path, "/engineering");
        assert!(group.parent_id.is_none());
    }

    #[test]
    fn test_client_defaults() {
        let client = KcClient::new(Uuid::now_v7(), Uuid::now_v7(), "acme-web", "kc-1");
        assert!(client.enabled);
        assert!(client.public_client);
        assert!(client.standard_flow_enabled);
        assert!(!client.direct_access_grants_enabled);
        assert_eq!(client.protocol, "openid-connect");
    }

    #[test]
    fn test_role_kind() {
        let realm_id = Uuid::now_v7();
        let realm_role = KcRole::new(Uuid::now_v7(), realm_id, None, "admin", "r-1");
        let client_role = KcRole::new(
            Uuid::now_v7(),
            realm_id,
            Some(Uuid::now_v7()),
            "viewer",
            "c-1/viewer",
        );
        assert!(!realm_role.is_client_role());
        assert!(client_role.is_client_role());
    }

    #[test]
    fn test_client_serializes_camel_case() {
        let client = KcClient::new(Uuid::now_v7(), Uuid::now_v7(), "acme-web", "kc-1");
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["clientId"], "acme-web");
        assert_eq!(json["keycloakId"], "kc-1");
        assert!(json.get("redirectUris").is_some());
    }
}
