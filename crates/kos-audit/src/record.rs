//! Action record definitions.
//!
//! A record is split in two: the [`ActionFacts`] describing the mutation,
//! which never change once written, and the [`RevertAnnotation`], which is
//! filled in at most once when a later action reverts this one.

use chrono::{DateTime, Utc};
use kos_core::{ActionType, Actor, EntityType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::diff::changed_fields;

/// One row of the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    /// Unique, time-ordered identifier.
    pub id: Uuid,

    /// What happened.
    #[serde(flatten)]
    pub facts: ActionFacts,

    /// Whether and how it was undone.
    #[serde(flatten)]
    pub annotation: RevertAnnotation,
}

/// The immutable description of an administrative action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFacts {
    /// Who performed the action.
    pub actor: Actor,

    /// Kind of mutation.
    pub action_type: ActionType,

    /// Kind of entity.
    pub entity_type: EntityType,

    /// Local id of the entity, stable across delete and recreate.
    pub entity_id: Uuid,

    /// Id of the entity in Keycloak, when it has one.
    #[serde(default)]
    pub entity_external_id: Option<String>,

    /// Label captured when the action was recorded.
    pub entity_name: String,

    /// Realm the entity lives in.
    pub realm_name: String,

    /// Local id of the realm.
    #[serde(default)]
    pub realm_id: Option<Uuid>,

    /// Entity state before the action (updates and deletes).
    #[serde(default)]
    pub before_state: Option<Value>,

    /// Entity state after the action (creates and updates).
    #[serde(default)]
    pub after_state: Option<Value>,

    /// Top-level keys that changed (updates only).
    #[serde(default)]
    pub changed_fields: Option<Vec<String>>,

    /// Set when this record was written by a revert; points at the original.
    #[serde(default)]
    pub revert_of_action_id: Option<Uuid>,

    /// When the action was recorded. Strictly increasing per entity.
    pub created_at: DateTime<Utc>,
}

/// Revert bookkeeping, written once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertAnnotation {
    /// Whether the action has been reverted.
    #[serde(default)]
    pub reverted: bool,

    /// When it was reverted.
    #[serde(default)]
    pub reverted_at: Option<DateTime<Utc>>,

    /// Keycloak id of the actor who reverted it.
    #[serde(default)]
    pub reverted_by_actor_id: Option<String>,

    /// Operator-supplied reason.
    #[serde(default)]
    pub revert_reason: Option<String>,
}

impl RevertAnnotation {
    /// Annotation for an action reverted now by `actor`.
    #[must_use]
    pub fn reverted_by(actor: &Actor, reason: impl Into<String>) -> Self {
        Self {
            reverted: true,
            reverted_at: Some(Utc::now()),
            reverted_by_actor_id: Some(actor.keycloak_id.clone()),
            revert_reason: Some(reason.into()),
        }
    }
}

impl ActionRecord {
    /// Wraps facts into a fresh, unreverted record with a new v7 id.
    #[must_use]
    pub fn new(facts: ActionFacts) -> Self {
        Self {
            id: Uuid::now_v7(),
            facts,
            annotation: RevertAnnotation::default(),
        }
    }

    /// Returns true if the record carries a revert annotation.
    #[must_use]
    pub const fn is_reverted(&self) -> bool {
        self.annotation.reverted
    }

    /// Returns true if this record was itself written by a revert.
    #[must_use]
    pub const fn is_revert(&self) -> bool {
        self.facts.revert_of_action_id.is_some()
    }

    /// Builds the facts of the record that undoes this one.
    ///
    /// The inverse keeps the entity identity and realm, inverts the action
    /// type, swaps the snapshots and points back at this record.
    #[must_use]
    pub fn inverse_facts(&self, actor: &Actor) -> ActionFacts {
        let before_state = self.facts.after_state.clone();
        let after_state = self.facts.before_state.clone();
        let action_type = self.facts.action_type.inverse();

        let changed = match (action_type, &before_state, &after_state) {
            (ActionType::Update, Some(before), Some(after)) => {
                Some(changed_fields(before, after).unwrap_or_default())
            }
            _ => None,
        };

        ActionFacts {
            actor: actor.clone(),
            action_type,
            entity_type: self.facts.entity_type,
            entity_id: self.facts.entity_id,
            entity_external_id: self.facts.entity_external_id.clone(),
            entity_name: self.facts.entity_name.clone(),
            realm_name: self.facts.realm_name.clone(),
            realm_id: self.facts.realm_id,
            before_state,
            after_state,
            changed_fields: changed,
            revert_of_action_id: Some(self.id),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(action_type: ActionType, before: Option<Value>, after: Option<Value>) -> ActionFacts {
        ActionFacts {
            actor: Actor::new("admin-1"),
            action_type,
            entity_type: EntityType::Client,
            entity_id: Uuid::now_v7(),
            entity_external_id: Some("kc-1".to_string()),
            entity_name: "acme-web".to_string(),
            realm_name: "acme".to_string(),
            realm_id: None,
            before_state: before,
            after_state: after,
            changed_fields: None,
            revert_of_action_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_inverse_of_create_is_delete() {
        let original = ActionRecord::new(facts(
            ActionType::Create,
            None,
            Some(json!({"clientId": "acme-web"})),
        ));
        let inverse = original.inverse_facts(&Actor::new("admin-2"));

        assert_eq!(inverse.action_type, ActionType::Delete);
        assert_eq!(inverse.before_state, Some(json!({"clientId": "acme-web"})));
        assert!(inverse.after_state.is_none());
        assert_eq!(inverse.revert_of_action_id, Some(original.id));
        assert_eq!(inverse.entity_id, original.facts.entity_id);
        assert_eq!(inverse.actor.keycloak_id, "admin-2");
        assert!(inverse.changed_fields.is_none());
    }

    #[test]
    fn test_inverse_of_update_swaps_snapshots() {
        let original = ActionRecord::new(facts(
            ActionType::Update,
            Some(json!({"name": "A"})),
            Some(json!({"name": "B"})),
        ));
        let inverse = original.inverse_facts(&Actor::new("admin-2"));

        assert_eq!(inverse.action_type, ActionType::Update);
        assert_eq!(inverse.before_state, Some(json!({"name": "B"})));
        assert_eq!(inverse.after_state, Some(json!({"name": "A"})));
        assert_eq!(inverse.changed_fields, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let mut record = ActionRecord::new(facts(ActionType::Delete, Some(json!({})), None));
        record.annotation = RevertAnnotation::reverted_by(&Actor::new("admin-2"), "oops");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["actionType"], "DELETE");
        assert_eq!(json["entityType"], "CLIENT");
        assert_eq!(json["reverted"], true);
        assert_eq!(json["revertedByActorId"], "admin-2");
        assert_eq!(json["revertReason"], "oops");

        let parsed: ActionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_new_record_is_unreverted() {
        let record = ActionRecord::new(facts(ActionType::Create, None, Some(json!({}))));
        assert!(!record.is_reverted());
        assert!(!record.is_revert());
        assert_eq!(record.annotation, RevertAnnotation::default());
    }
}
