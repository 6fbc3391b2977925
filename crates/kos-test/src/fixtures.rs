//! Fixtures for action records, snapshots and projection rows.

use chrono::{DateTime, Utc};
use kos_audit::{ActionFacts, ActionRecord};
use kos_core::{ActionType, Actor, EntityType, KcClient, KcGroup, KcRealm, KcRole};
use kos_projection::{ClientRepository, GroupRepository, RealmRepository, RoleRepository};
use serde_json::{json, Value};
use uuid::Uuid;

/// Realm name used by the fixtures.
pub const TEST_REALM: &str = "acme";

/// Builder for mock actors.
///
/// # Examples
///
/// ```rust
/// use kos_test::MockActor;
///
/// let admin = MockActor::admin();
/// assert_eq!(admin.keycloak_id, "mock-admin");
///
/// let auditor = MockActor::new("auditor-1").with_email("auditor@example.com").build();
/// assert_eq!(auditor.email.as_deref(), Some("auditor@example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct MockActor {
    actor: Actor,
}

impl MockActor {
    /// Starts a builder with the given Keycloak id.
    #[must_use]
    pub fn new(keycloak_id: impl Into<String>) -> Self {
        Self {
            actor: Actor::new(keycloak_id),
        }
    }

    /// The administrator who performs most fixture actions.
    #[must_use]
    pub fn admin() -> Actor {
        Self::new("mock-admin")
            .with_email("admin@example.com")
            .with_display_name("Mock Admin")
            .build()
    }

    /// A second operator, typically the one who reverts.
    #[must_use]
    pub fn operator() -> Actor {
        Self::new("mock-operator")
            .with_email("operator@example.com")
            .build()
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.actor = self.actor.with_email(email);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.actor = self.actor.with_display_name(name);
        self
    }

    /// Builds the [`Actor`].
    #[must_use]
    pub fn build(self) -> Actor {
        self.actor
    }
}

/// Client snapshot as a client service would record it.
#[must_use]
pub fn client_state(client_id: &str) -> Value {
    json!({
        "clientId": client_id,
        "enabled": true,
        "publicClient": true,
        "redirectUris": [],
        "webOrigins": []
    })
}

/// Role snapshot. `client` is the local id of the owning client.
#[must_use]
pub fn role_state(name: &str, client: Option<Uuid>) -> Value {
    json!({
        "name": name,
        "description": null,
        "clientId": client.map(|id| id.to_string())
    })
}

/// Top-level group snapshot.
#[must_use]
pub fn group_state(name: &str) -> Value {
    json!({
        "name": name,
        "path": format!("/{name}")
    })
}

/// Builder for action records that bypass the recorder.
///
/// # Examples
///
/// ```rust
/// use kos_core::ActionType;
/// use kos_test::ActionFixture;
///
/// let record = ActionFixture::client_create("acme-web")
///     .external_id("kc-7")
///     .build();
/// assert_eq!(record.facts.action_type, ActionType::Create);
/// assert!(!record.is_reverted());
/// ```
#[derive(Debug, Clone)]
pub struct ActionFixture {
    facts: ActionFacts,
}

impl ActionFixture {
    /// Starts a fixture for an action on a fresh entity.
    #[must_use]
    pub fn new(action_type: ActionType, entity_type: EntityType, entity_name: &str) -> Self {
        Self {
            facts: ActionFacts {
                actor: MockActor::admin(),
                action_type,
                entity_type,
                entity_id: Uuid::now_v7(),
                entity_external_id: None,
                entity_name: entity_name.to_string(),
                realm_name: TEST_REALM.to_string(),
                realm_id: None,
                before_state: None,
                after_state: None,
                changed_fields: None,
                revert_of_action_id: None,
                created_at: Utc::now(),
            },
        }
    }

    /// A client CREATE with a recorded after state.
    #[must_use]
    pub fn client_create(client_id: &str) -> Self {
        Self::new(ActionType::Create, EntityType::Client, client_id)
            .after_state(client_state(client_id))
    }

    /// Sets the entity id.
    #[must_use]
    pub const fn entity_id(mut self, entity_id: Uuid) -> Self {
        self.facts.entity_id = entity_id;
        self
    }

    /// Sets the external id.
    #[must_use]
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.facts.entity_external_id = Some(external_id.into());
        self
    }

    /// Sets the realm name.
    #[must_use]
    pub fn realm(mut self, realm_name: impl Into<String>) -> Self {
        self.facts.realm_name = realm_name.into();
        self
    }

    /// Sets the before state.
    #[must_use]
    pub fn before_state(mut self, state: Value) -> Self {
        self.facts.before_state = Some(state);
        self
    }

    /// Sets the after state.
    #[must_use]
    pub fn after_state(mut self, state: Value) -> Self {
        self.facts.after_state = Some(state);
        self
    }

    /// Sets the actor.
    #[must_use]
    pub fn actor(mut self, actor: Actor) -> Self {
        self.facts.actor = actor;
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.facts.created_at = created_at;
        self
    }

    /// Returns the facts.
    #[must_use]
    pub fn facts(self) -> ActionFacts {
        self.facts
    }

    /// Builds an unreverted record with a fresh id.
    #[must_use]
    pub fn build(self) -> ActionRecord {
        ActionRecord::new(self.facts)
    }
}

/// Saves a realm row named `name`.
///
/// # Errors
///
/// Returns an error if the projection rejects the row.
pub async fn seed_realm<P>(projection: &P, name: &str) -> kos_projection::Result<KcRealm>
where
    P: RealmRepository + ?Sized,
{
    projection.save(KcRealm::new(name)).await
}

/// Saves a client row in `realm`.
///
/// # Errors
///
/// Returns an error if the projection rejects the row.
pub async fn seed_client<P>(
    projection: &P,
    realm: &KcRealm,
    client_id: &str,
    keycloak_id: &str,
) -> kos_projection::Result<KcClient>
where
    P: ClientRepository + ?Sized,
{
    projection
        .save(KcClient::new(Uuid::now_v7(), realm.id, client_id, keycloak_id))
        .await
}

/// Saves a role row in `realm`, owned by `client` when given.
///
/// # Errors
///
/// Returns an error if the projection rejects the row.
pub async fn seed_role<P>(
    projection: &P,
    realm: &KcRealm,
    client: Option<&KcClient>,
    name: &str,
) -> kos_projection::Result<KcRole>
where
    P: RoleRepository + ?Sized,
{
    let keycloak_id = client.map_or_else(
        || format!("kc-role-{name}"),
        |c| format!("{}/{name}", c.keycloak_id),
    );
    projection
        .save(KcRole::new(
            Uuid::now_v7(),
            realm.id,
            client.map(|c| c.id),
            name,
            keycloak_id,
        ))
        .await
}

/// Saves a top-level group row in `realm`.
///
/// # Errors
///
/// Returns an error if the projection rejects the row.
pub async fn seed_group<P>(
    projection: &P,
    realm: &KcRealm,
    name: &str,
    keycloak_id: &str,
) -> kos_projection::Result<KcGroup>
where
    P: GroupRepository + ?Sized,
{
    projection
        .save(KcGroup::top_level(Uuid::now_v7(), realm.id, name, keycloak_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kos_projection::InMemoryProjection;

    #[test]
    fn test_role_state_client_id() {
        let client = Uuid::now_v7();
        assert_eq!(role_state("editor", Some(client))["clientId"], client.to_string());
        assert!(role_state("viewer", None)["clientId"].is_null());
    }

    #[test]
    fn test_action_fixture_defaults() {
        let record = ActionFixture::new(ActionType::Update, EntityType::Group, "ops").build();
        assert_eq!(record.facts.realm_name, TEST_REALM);
        assert_eq!(record.facts.actor.keycloak_id, "mock-admin");
        assert!(record.facts.before_state.is_none());
    }

    #[tokio::test]
    async fn test_seed_client_role() {
        let projection = InMemoryProjection::new();
        let realm = seed_realm(&projection, TEST_REALM).await.unwrap();
        let client = seed_client(&projection, &realm, "acme-web", "kc-c").await.unwrap();
        let role = seed_role(&projection, &realm, Some(&client), "editor")
            .await
            .unwrap();
        assert_eq!(role.keycloak_id, "kc-c/editor");
        assert_eq!(role.client_id, Some(client.id));
    }
}
