//! Compensation strategies and their registry.
//!
//! A strategy undoes one kind of entity mutation in two phases. The engine
//! always runs [`CompensationStrategy::compensate_external`] first and only
//! calls [`CompensationStrategy::compensate_local`] once the identity
//! provider has accepted the change.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use kos_audit::ActionRecord;
use kos_core::{ActionType, EntityType, KcRealm};
use kos_keycloak::{IdpAdmin, KeycloakError};
use kos_projection::{
    ClientRepository, GroupRepository, ProjectionError, RealmRepository, RoleRepository,
};
use serde_json::Value;

use crate::error::{RevertError, Result};
use crate::strategies::{ClientStrategy, GroupStrategy, RoleStrategy};

/// Collaborators a strategy may call.
#[derive(Debug, Clone)]
pub struct RevertContext {
    /// Identity provider admin API.
    pub idp: Arc<dyn IdpAdmin>,
    /// Realm rows.
    pub realms: Arc<dyn RealmRepository>,
    /// Client rows.
    pub clients: Arc<dyn ClientRepository>,
    /// Role rows.
    pub roles: Arc<dyn RoleRepository>,
    /// Group rows.
    pub groups: Arc<dyn GroupRepository>,
}

impl RevertContext {
    /// Builds a context from one projection that implements every
    /// repository.
    pub fn new<P>(idp: Arc<dyn IdpAdmin>, projection: Arc<P>) -> Self
    where
        P: RealmRepository + ClientRepository + RoleRepository + GroupRepository + 'static,
    {
        Self {
            idp,
            realms: projection.clone(),
            clients: projection.clone(),
            roles: projection.clone(),
            groups: projection,
        }
    }

    /// Resolves the record's realm row by name.
    pub(crate) async fn realm(&self, record: &ActionRecord) -> Result<KcRealm> {
        let name = &record.facts.realm_name;
        self.realms
            .find_by_name(name)
            .await
            .map_err(|e| internal(record, &e))?
            .ok_or_else(|| RevertError::NotFound {
                what: format!("realm {name}"),
            })
    }
}

/// What the external phase did, handed to the local phase.
#[derive(Debug, Clone)]
pub struct ExternalEffect {
    /// Realm the compensation ran in.
    pub realm: KcRealm,
    /// External id assigned by the identity provider when an entity was
    /// recreated.
    pub new_external_id: Option<String>,
}

impl ExternalEffect {
    /// Effect of a compensation that recreated nothing.
    #[must_use]
    pub const fn in_realm(realm: KcRealm) -> Self {
        Self {
            realm,
            new_external_id: None,
        }
    }

    /// Effect of a compensation that recreated an entity.
    #[must_use]
    pub fn recreated(realm: KcRealm, external_id: impl Into<String>) -> Self {
        Self {
            realm,
            new_external_id: Some(external_id.into()),
        }
    }
}

/// Undoes mutations of one entity kind.
#[async_trait]
pub trait CompensationStrategy: Send + Sync + Debug {
    /// Entity kind this strategy handles.
    fn entity_type(&self) -> EntityType;

    /// Human-readable label used in outcome messages, e.g. `Client`.
    fn label(&self) -> &'static str;

    /// Applies the compensating change in the identity provider.
    ///
    /// Must not touch the local projection.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the record cannot be compensated, or
    /// [`RevertError::External`] if the identity provider refuses.
    async fn compensate_external(
        &self,
        ctx: &RevertContext,
        record: &ActionRecord,
    ) -> Result<ExternalEffect>;

    /// Brings the local projection in line with the identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if a projection write fails.
    async fn compensate_local(
        &self,
        ctx: &RevertContext,
        record: &ActionRecord,
        effect: &ExternalEffect,
    ) -> Result<()>;

    /// Message reported for a successful revert of `action_type`.
    fn outcome_message(&self, action_type: ActionType) -> String {
        let label = self.label();
        match action_type {
            ActionType::Create => format!("{label} deleted (reverted CREATE)"),
            ActionType::Delete => format!("{label} restored (reverted DELETE)"),
            ActionType::Update => format!("{label} restored to previous state (reverted UPDATE)"),
        }
    }
}

/// Strategies keyed by entity kind.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<EntityType, Arc<dyn CompensationStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the client, role and group strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ClientStrategy));
        registry.register(Arc::new(RoleStrategy));
        registry.register(Arc::new(GroupStrategy));
        registry
    }

    /// Registers a strategy, replacing any previous one for its kind.
    pub fn register(&mut self, strategy: Arc<dyn CompensationStrategy>) {
        self.strategies.insert(strategy.entity_type(), strategy);
    }

    /// Returns the strategy for a kind.
    #[must_use]
    pub fn get(&self, entity_type: EntityType) -> Option<Arc<dyn CompensationStrategy>> {
        self.strategies.get(&entity_type).cloned()
    }

    /// Returns true if a strategy is registered for the kind.
    #[must_use]
    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.strategies.contains_key(&entity_type)
    }
}

// Helpers shared by the strategies.

pub(crate) fn external_id(record: &ActionRecord) -> Result<&str> {
    record
        .facts
        .entity_external_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid(record, "missing Keycloak ID"))
}

pub(crate) fn before_state(record: &ActionRecord) -> Result<&Value> {
    record
        .facts
        .before_state
        .as_ref()
        .ok_or_else(|| invalid(record, "no before state to restore"))
}

pub(crate) fn after_state(record: &ActionRecord) -> Result<&Value> {
    record
        .facts
        .after_state
        .as_ref()
        .ok_or_else(|| invalid(record, "no after state recorded"))
}

pub(crate) fn invalid(record: &ActionRecord, reason: impl Into<String>) -> RevertError {
    RevertError::InvalidRecord {
        action_id: record.id,
        reason: reason.into(),
    }
}

pub(crate) fn external(record: &ActionRecord, source: KeycloakError) -> RevertError {
    RevertError::External {
        action_id: record.id,
        source,
    }
}

pub(crate) fn internal(record: &ActionRecord, error: &ProjectionError) -> RevertError {
    RevertError::Internal {
        action_id: record.id,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = StrategyRegistry::with_defaults();
        assert!(registry.contains(EntityType::Client));
        assert!(registry.contains(EntityType::Role));
        assert!(registry.contains(EntityType::Group));
        assert!(!registry.contains(EntityType::Idp));
        assert!(!registry.contains(EntityType::Realm));
        assert!(!registry.contains(EntityType::User));
    }

    #[test]
    fn test_outcome_messages() {
        let registry = StrategyRegistry::with_defaults();
        let client = registry.get(EntityType::Client).unwrap();
        assert_eq!(
            client.outcome_message(ActionType::Create),
            "Client deleted (reverted CREATE)"
        );
        let group = registry.get(EntityType::Group).unwrap();
        assert_eq!(
            group.outcome_message(ActionType::Update),
            "Group restored to previous state (reverted UPDATE)"
        );
        let role = registry.get(EntityType::Role).unwrap();
        assert_eq!(
            role.outcome_message(ActionType::Delete),
            "Role restored (reverted DELETE)"
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = StrategyRegistry::new();
        assert!(registry.get(EntityType::Client).is_none());
        registry.register(Arc::new(ClientStrategy));
        registry.register(Arc::new(ClientStrategy));
        assert!(registry.contains(EntityType::Client));
    }
}
