//! Typed views over the JSON snapshots stored in action records.
//!
//! Snapshots are opaque documents written by whatever service recorded the
//! action. Only the keys read here are interpreted; everything else is
//! ignored, and absent keys fall back to the identity provider's defaults
//! for a newly created entity.

use chrono::Utc;
use kos_core::KcClient;
use kos_keycloak::{ClientRepresentation, GroupRepresentation, RoleRepresentation};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Failure to read a snapshot. Carries a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SnapshotError(pub String);

type Result<T> = std::result::Result<T, SnapshotError>;

fn object<'a>(snapshot: &'a Value, label: &str) -> Result<&'a Map<String, Value>> {
    snapshot
        .as_object()
        .ok_or_else(|| SnapshotError(format!("{label} snapshot is not a JSON object")))
}

fn required_str(map: &Map<String, Value>, key: &str, label: &str) -> Result<String> {
    optional_str(map, key)
        .ok_or_else(|| SnapshotError(format!("{label} snapshot has no '{key}'")))
}

fn optional_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn flag(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Client fields captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    /// OAuth client id.
    pub client_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Enabled flag.
    pub enabled: bool,
    /// Public client flag.
    pub public_client: bool,
    /// Root URL.
    pub root_url: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Redirect URIs.
    pub redirect_uris: Vec<String>,
    /// CORS origins.
    pub web_origins: Vec<String>,
    /// Authorization code flow.
    pub standard_flow_enabled: bool,
    /// Password grant.
    pub direct_access_grants_enabled: bool,
    /// Service account.
    pub service_accounts_enabled: bool,
}

impl ClientSnapshot {
    /// Reads a client snapshot. `clientId` is required.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no `clientId`.
    pub fn parse(snapshot: &Value) -> Result<Self> {
        let map = object(snapshot, "client")?;
        Ok(Self {
            client_id: required_str(map, "clientId", "client")?,
            name: optional_str(map, "name"),
            description: optional_str(map, "description"),
            enabled: flag(map, "enabled", true),
            public_client: flag(map, "publicClient", true),
            root_url: optional_str(map, "rootUrl"),
            base_url: optional_str(map, "baseUrl"),
            redirect_uris: string_list(map, "redirectUris"),
            web_origins: string_list(map, "webOrigins"),
            standard_flow_enabled: flag(map, "standardFlowEnabled", true),
            direct_access_grants_enabled: flag(map, "directAccessGrantsEnabled", false),
            service_accounts_enabled: flag(map, "serviceAccountsEnabled", false),
        })
    }

    /// Builds the representation sent to the identity provider.
    #[must_use]
    pub fn to_representation(&self) -> ClientRepresentation {
        let mut rep = ClientRepresentation::new(self.client_id.clone());
        rep.name.clone_from(&self.name);
        rep.description.clone_from(&self.description);
        rep.enabled = self.enabled;
        rep.public_client = self.public_client;
        rep.root_url.clone_from(&self.root_url);
        rep.base_url.clone_from(&self.base_url);
        rep.redirect_uris = Some(self.redirect_uris.clone());
        rep.web_origins = Some(self.web_origins.clone());
        rep.standard_flow_enabled = self.standard_flow_enabled;
        rep.direct_access_grants_enabled = self.direct_access_grants_enabled;
        rep.service_accounts_enabled = self.service_accounts_enabled;
        rep
    }

    /// Overwrites the mutable fields of a projection row.
    pub fn apply_to(&self, client: &mut KcClient) {
        client.client_id.clone_from(&self.client_id);
        client.name.clone_from(&self.name);
        client.description.clone_from(&self.description);
        client.enabled = self.enabled;
        client.public_client = self.public_client;
        client.root_url.clone_from(&self.root_url);
        client.base_url.clone_from(&self.base_url);
        client.redirect_uris.clone_from(&self.redirect_uris);
        client.web_origins.clone_from(&self.web_origins);
        client.standard_flow_enabled = self.standard_flow_enabled;
        client.direct_access_grants_enabled = self.direct_access_grants_enabled;
        client.service_accounts_enabled = self.service_accounts_enabled;
        client.updated_at = Some(Utc::now());
    }
}

/// Role fields captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    /// Role name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Local id of the owning client, for client roles.
    pub client_id: Option<Uuid>,
}

impl RoleSnapshot {
    /// Reads a role snapshot. `name` is required; `clientId`, when present,
    /// must be a UUID string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn parse(snapshot: &Value) -> Result<Self> {
        let map = object(snapshot, "role")?;
        let client_id = match map.get("clientId") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(Uuid::parse_str(raw).map_err(|e| {
                SnapshotError(format!("role snapshot has invalid 'clientId' {raw}: {e}"))
            })?),
            Some(other) => {
                return Err(SnapshotError(format!(
                    "role snapshot has non-string 'clientId': {other}"
                )))
            }
        };
        Ok(Self {
            name: required_str(map, "name", "role")?,
            description: optional_str(map, "description"),
            client_id,
        })
    }

    /// Builds the representation sent to the identity provider.
    #[must_use]
    pub fn to_representation(&self) -> RoleRepresentation {
        let mut rep = RoleRepresentation::new(self.name.clone(), self.description.clone());
        rep.client_role = self.client_id.is_some();
        rep
    }
}

/// Group fields captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Group name.
    pub name: String,
    /// Full path, if recorded.
    pub path: Option<String>,
}

impl GroupSnapshot {
    /// Reads a group snapshot. `name` is required.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no `name`.
    pub fn parse(snapshot: &Value) -> Result<Self> {
        let map = object(snapshot, "group")?;
        Ok(Self {
            name: required_str(map, "name", "group")?,
            path: optional_str(map, "path"),
        })
    }

    /// Builds a top-level group representation.
    #[must_use]
    pub fn to_representation(&self) -> GroupRepresentation {
        GroupRepresentation::top_level(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_defaults_for_absent_keys() {
        let snapshot = ClientSnapshot::parse(&json!({"clientId": "acme-web"})).unwrap();
        assert!(snapshot.enabled);
        assert!(snapshot.public_client);
        assert!(snapshot.standard_flow_enabled);
        assert!(!snapshot.direct_access_grants_enabled);
        assert!(!snapshot.service_accounts_enabled);
        assert!(snapshot.redirect_uris.is_empty());
        assert!(snapshot.name.is_none());
    }

    #[test]
    fn test_client_requires_client_id() {
        let err = ClientSnapshot::parse(&json!({"name": "Acme"})).unwrap_err();
        assert!(err.to_string().contains("clientId"));
        assert!(ClientSnapshot::parse(&json!("acme-web")).is_err());
    }

    #[test]
    fn test_client_lists_keep_strings_only() {
        let snapshot = ClientSnapshot::parse(&json!({
            "clientId": "acme-web",
            "redirectUris": ["https://acme.example/*", 42, null],
            "webOrigins": ["+"]
        }))
        .unwrap();
        assert_eq!(snapshot.redirect_uris, vec!["https://acme.example/*"]);
        assert_eq!(snapshot.web_origins, vec!["+"]);
    }

    #[test]
    fn test_client_apply_to_row() {
        let snapshot = ClientSnapshot::parse(&json!({
            "clientId": "acme-web",
            "name": "Acme Web",
            "enabled": false,
            "publicClient": false
        }))
        .unwrap();
        let mut row = KcClient::new(Uuid::now_v7(), Uuid::now_v7(), "renamed", "kc-1");
        snapshot.apply_to(&mut row);

        assert_eq!(row.client_id, "acme-web");
        assert_eq!(row.name.as_deref(), Some("Acme Web"));
        assert!(!row.enabled);
        assert!(!row.public_client);
        assert_eq!(row.keycloak_id, "kc-1");
        assert!(row.updated_at.is_some());
    }

    #[test]
    fn test_client_representation() {
        let rep = ClientSnapshot::parse(&json!({"clientId": "acme-web", "rootUrl": "https://acme.example"}))
            .unwrap()
            .to_representation();
        assert_eq!(rep.client_id, "acme-web");
        assert!(rep.public_client);
        assert_eq!(rep.root_url.as_deref(), Some("https://acme.example"));
        assert_eq!(rep.redirect_uris, Some(Vec::new()));
    }

    #[test]
    fn test_role_client_id_parsing() {
        let client = Uuid::now_v7();
        let snapshot =
            RoleSnapshot::parse(&json!({"name": "editor", "clientId": client.to_string()}))
                .unwrap();
        assert_eq!(snapshot.client_id, Some(client));
        assert!(snapshot.to_representation().client_role);

        let realm_role = RoleSnapshot::parse(&json!({"name": "viewer", "clientId": null})).unwrap();
        assert!(realm_role.client_id.is_none());

        assert!(RoleSnapshot::parse(&json!({"name": "x", "clientId": "not-a-uuid"})).is_err());
        assert!(RoleSnapshot::parse(&json!({"description": "no name"})).is_err());
    }

    #[test]
    fn test_group_path() {
        let snapshot = GroupSnapshot::parse(&json!({"name": "ops"})).unwrap();
        assert!(snapshot.path.is_none());
        assert_eq!(snapshot.to_representation().path.as_deref(), Some("/ops"));

        let snapshot = GroupSnapshot::parse(&json!({"name": "ops", "path": "/ops"})).unwrap();
        assert_eq!(snapshot.path.as_deref(), Some("/ops"));
    }
}
