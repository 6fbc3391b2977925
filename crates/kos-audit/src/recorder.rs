//! Audit recorder: turns administrative mutations into persisted records.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use kos_core::{ActionType, Actor, EntityType};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::diff::changed_fields;
use crate::error::Result;
use crate::record::{ActionFacts, ActionRecord};
use crate::store::{ActionLogStore, InMemoryActionLog};

/// Receives every record after it has been persisted.
///
/// Sinks are notification side channels; a failing sink never fails the
/// write that triggered it.
pub trait RecordSink: Send + Sync + Debug {
    /// Handles a persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot accept the record.
    fn emit(&self, record: &ActionRecord) -> Result<()>;

    /// Returns the sink name for identification.
    fn name(&self) -> &'static str;
}

/// Sink that logs each record as a structured tracing event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RecordSink for TracingSink {
    fn emit(&self, record: &ActionRecord) -> Result<()> {
        let facts = &record.facts;
        info!(
            action_id = %record.id,
            action_type = %facts.action_type,
            entity_type = %facts.entity_type,
            entity_id = %facts.entity_id,
            entity_name = %facts.entity_name,
            realm = %facts.realm_name,
            actor = %facts.actor.keycloak_id,
            revert_of = ?facts.revert_of_action_id,
            "Action recorded"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Describes one mutation to be recorded.
///
/// Snapshots accept any serializable value. A snapshot that fails to
/// serialize is stored as absent and a warning is logged.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    action_type: ActionType,
    entity_type: EntityType,
    entity_id: Uuid,
    entity_name: String,
    realm_name: String,
    realm_id: Option<Uuid>,
    external_id: Option<String>,
    before_state: Option<Value>,
    after_state: Option<Value>,
}

impl ActionEntry {
    /// Starts an entry for a mutation of `entity_id` in `realm_name`.
    #[must_use]
    pub fn new(
        action_type: ActionType,
        entity_type: EntityType,
        entity_id: Uuid,
        entity_name: impl Into<String>,
        realm_name: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            entity_type,
            entity_id,
            entity_name: entity_name.into(),
            realm_name: realm_name.into(),
            realm_id: None,
            external_id: None,
            before_state: None,
            after_state: None,
        }
    }

    /// Sets the local realm id.
    #[must_use]
    pub fn realm_id(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the entity's Keycloak id.
    #[must_use]
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Captures the state before the mutation.
    #[must_use]
    pub fn before_state<S: Serialize + ?Sized>(mut self, state: &S) -> Self {
        self.before_state = snapshot(state, "before");
        self
    }

    /// Captures the state after the mutation.
    #[must_use]
    pub fn after_state<S: Serialize + ?Sized>(mut self, state: &S) -> Self {
        self.after_state = snapshot(state, "after");
        self
    }

    fn into_facts(self, actor: &Actor) -> ActionFacts {
        let changed = (self.action_type == ActionType::Update)
            .then(|| update_diff(self.before_state.as_ref(), self.after_state.as_ref()));

        ActionFacts {
            actor: actor.clone(),
            action_type: self.action_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_external_id: self.external_id,
            entity_name: self.entity_name,
            realm_name: self.realm_name,
            realm_id: self.realm_id,
            before_state: self.before_state,
            after_state: self.after_state,
            changed_fields: changed,
            revert_of_action_id: None,
            created_at: Utc::now(),
        }
    }
}

fn snapshot<S: Serialize + ?Sized>(state: &S, which: &'static str) -> Option<Value> {
    match serde_json::to_value(state) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(snapshot = which, error = %e, "Failed to serialize entity snapshot, storing it as absent");
            None
        }
    }
}

fn update_diff(before: Option<&Value>, after: Option<&Value>) -> Vec<String> {
    let diff = match (before, after) {
        (Some(before), Some(after)) => changed_fields(before, after),
        _ => None,
    };

    diff.unwrap_or_else(|| {
        warn!("Update snapshots are not both JSON objects, recording empty field diff");
        Vec::new()
    })
}

/// Writes action records to a store and fans them out to sinks.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    store: Arc<dyn ActionLogStore>,
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl AuditRecorder {
    /// Creates a recorder over `store` with no sinks.
    #[must_use]
    pub fn new(store: Arc<dyn ActionLogStore>) -> Self {
        Self {
            store,
            sinks: Vec::new(),
        }
    }

    /// Creates a builder for configuring the recorder.
    #[must_use]
    pub fn builder() -> AuditRecorderBuilder {
        AuditRecorderBuilder::new()
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ActionLogStore> {
        &self.store
    }

    /// Returns the number of configured sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Records a mutation performed by `actor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails. Sink failures are logged.
    pub async fn record(&self, actor: &Actor, entry: ActionEntry) -> Result<ActionRecord> {
        self.record_facts(entry.into_facts(actor)).await
    }

    /// Records a mutation performed by the system actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn record_system(&self, entry: ActionEntry) -> Result<ActionRecord> {
        self.record(&Actor::system(), entry).await
    }

    /// Persists prepared facts as a new record.
    ///
    /// Used for records that are derived rather than described, such as the
    /// inverse record written by a revert.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn record_facts(&self, facts: ActionFacts) -> Result<ActionRecord> {
        let record = ActionRecord::new(facts);
        let action_id = record.id;

        let stored = self.store.insert(record).await.map_err(|e| {
            error!(
                action_id = %action_id,
                store = self.store.name(),
                error = %e,
                "Failed to persist action record"
            );
            e
        })?;

        debug!(action_id = %stored.id, store = self.store.name(), "Persisted action record");

        for sink in &self.sinks {
            if let Err(e) = sink.emit(&stored) {
                error!(action_id = %stored.id, sink = sink.name(), error = %e, "Record sink failed");
            }
        }

        Ok(stored)
    }
}

/// Builder for configuring an audit recorder.
#[derive(Debug, Default)]
pub struct AuditRecorderBuilder {
    store: Option<Arc<dyn ActionLogStore>>,
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl AuditRecorderBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backing store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ActionLogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the recorder. Without a store, records are kept in memory.
    #[must_use]
    pub fn build(self) -> AuditRecorder {
        AuditRecorder {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryActionLog::new()) as Arc<dyn ActionLogStore>),
            sinks: self.sinks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::record::RevertAnnotation;
    use crate::store::RecordFilter;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::ser::Error as _;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct CollectingSink {
        ids: Mutex<Vec<Uuid>>,
    }

    impl RecordSink for CollectingSink {
        fn emit(&self, record: &ActionRecord) -> Result<()> {
            self.ids.lock().unwrap().push(record.id);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "collecting"
        }
    }

    #[derive(Debug)]
    struct FailingSink;

    impl RecordSink for FailingSink {
        fn emit(&self, _record: &ActionRecord) -> Result<()> {
            Err(AuditError::Store("sink offline".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl ActionLogStore for BrokenStore {
        async fn insert(&self, _record: ActionRecord) -> Result<ActionRecord> {
            Err(AuditError::Store("disk full".to_string()))
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<ActionRecord>> {
            Ok(None)
        }
        async fn mark_reverted(&self, id: Uuid, _a: RevertAnnotation) -> Result<ActionRecord> {
            Err(AuditError::NotFound { id })
        }
        async fn has_later_unreverted(
            &self,
            _t: EntityType,
            _id: Uuid,
            _after: DateTime<Utc>,
        ) -> Result<bool> {
            Ok(false)
        }
        async fn list(&self, _f: &RecordFilter, _o: usize, _l: usize) -> Result<Vec<ActionRecord>> {
            Ok(Vec::new())
        }
        async fn count(&self, _f: &RecordFilter) -> Result<u64> {
            Ok(0)
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _s: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot snapshot"))
        }
    }

    fn update_entry() -> ActionEntry {
        ActionEntry::new(
            ActionType::Update,
            EntityType::Client,
            Uuid::now_v7(),
            "acme-web",
            "acme",
        )
    }

    #[tokio::test]
    async fn test_record_update_computes_diff() {
        let recorder = AuditRecorder::builder().build();
        let entry = update_entry()
            .external_id("kc-123")
            .before_state(&json!({"a": 1, "b": 2}))
            .after_state(&json!({"a": 1, "b": 3, "c": 4}));

        let record = recorder.record(&Actor::new("admin-1"), entry).await.unwrap();
        assert_eq!(
            record.facts.changed_fields,
            Some(vec!["b".to_string(), "c".to_string()])
        );
        assert_eq!(record.facts.entity_external_id.as_deref(), Some("kc-123"));
        assert!(!record.is_reverted());

        let stored = recorder.store().find_by_id(record.id).await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn test_record_create_has_no_diff() {
        let recorder = AuditRecorder::builder().build();
        let entry = ActionEntry::new(
            ActionType::Create,
            EntityType::Group,
            Uuid::now_v7(),
            "engineering",
            "acme",
        )
        .after_state(&json!({"name": "engineering"}));

        let record = recorder.record(&Actor::new("admin-1"), entry).await.unwrap();
        assert!(record.facts.changed_fields.is_none());
        assert!(record.facts.before_state.is_none());
    }

    #[tokio::test]
    async fn test_record_system_uses_system_actor() {
        let recorder = AuditRecorder::builder().build();
        let record = recorder.record_system(update_entry()).await.unwrap();
        assert!(record.facts.actor.is_system());
        assert_eq!(record.facts.actor.display_name.as_deref(), Some("System"));
    }

    #[tokio::test]
    async fn test_unserializable_snapshot_degrades() {
        let recorder = AuditRecorder::builder().build();
        let entry = update_entry()
            .before_state(&Unserializable)
            .after_state(&json!({"a": 1}));

        let record = recorder.record(&Actor::new("admin-1"), entry).await.unwrap();
        assert!(record.facts.before_state.is_none());
        assert_eq!(record.facts.changed_fields, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_non_object_snapshot_records_empty_diff() {
        let recorder = AuditRecorder::builder().build();
        let entry = update_entry()
            .before_state(&json!(["a"]))
            .after_state(&json!({"a": 1}));

        let record = recorder.record(&Actor::new("admin-1"), entry).await.unwrap();
        assert_eq!(record.facts.changed_fields, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let recorder = AuditRecorder::new(Arc::new(BrokenStore));
        let err = recorder
            .record(&Actor::new("admin-1"), update_entry())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Store(_)));
    }

    #[tokio::test]
    async fn test_sinks_receive_records_and_failures_are_ignored() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = AuditRecorder::builder()
            .with_sink(Arc::new(FailingSink))
            .with_sink(sink.clone())
            .with_sink(Arc::new(TracingSink::new()))
            .build();
        assert_eq!(recorder.sink_count(), 3);

        let record = recorder
            .record(&Actor::new("admin-1"), update_entry())
            .await
            .unwrap();
        assert_eq!(*sink.ids.lock().unwrap(), vec![record.id]);
    }
}
