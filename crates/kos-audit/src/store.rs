//! Action log storage backends.
//!
//! The store is append-oriented: records are inserted once and the only
//! later write is [`ActionLogStore::mark_reverted`], which refuses to touch a
//! record that already carries a revert annotation.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kos_core::EntityType;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuditError, Result};
use crate::record::{ActionRecord, RevertAnnotation};

/// Selects a subset of the log for listing and counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record.
    All,
    /// Records written by the actor with this Keycloak id.
    Actor(String),
    /// Records in this realm.
    Realm(String),
    /// Records about one entity.
    Entity {
        /// Entity kind.
        entity_type: EntityType,
        /// Local entity id.
        entity_id: Uuid,
    },
    /// Records about any entity of this kind.
    EntityType(EntityType),
    /// Records that have not been reverted.
    Unreverted,
}

impl RecordFilter {
    /// Returns true if the record is selected by this filter.
    #[must_use]
    pub fn matches(&self, record: &ActionRecord) -> bool {
        let facts = &record.facts;
        match self {
            Self::All => true,
            Self::Actor(id) => facts.actor.keycloak_id == *id,
            Self::Realm(name) => facts.realm_name == *name,
            Self::Entity {
                entity_type,
                entity_id,
            } => facts.entity_type == *entity_type && facts.entity_id == *entity_id,
            Self::EntityType(entity_type) => facts.entity_type == *entity_type,
            Self::Unreverted => !record.is_reverted(),
        }
    }
}

/// Backend trait for action log storage.
#[async_trait]
pub trait ActionLogStore: Send + Sync + Debug {
    /// Appends a record and returns it as stored.
    ///
    /// Stores keep `created_at` strictly increasing per entity, so the
    /// returned record may carry a slightly later timestamp than the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted or its id exists.
    async fn insert(&self, record: ActionRecord) -> Result<ActionRecord>;

    /// Looks up a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ActionRecord>>;

    /// Writes the revert annotation of a record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::NotFound`] for unknown ids and
    /// [`AuditError::AlreadyReverted`] if an annotation exists.
    async fn mark_reverted(&self, id: Uuid, annotation: RevertAnnotation) -> Result<ActionRecord>;

    /// Returns true if a non-reverted record exists for the entity with
    /// `created_at` strictly after `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn has_later_unreverted(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool>;

    /// Lists matching records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn list(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ActionRecord>>;

    /// Counts matching records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn count(&self, filter: &RecordFilter) -> Result<u64>;

    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;
}

/// Log contents shared by the in-memory and file backends.
#[derive(Debug, Default, Clone)]
struct LogState {
    records: Vec<ActionRecord>,
}

impl LogState {
    fn insert(&mut self, mut record: ActionRecord) -> Result<ActionRecord> {
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(AuditError::Store(format!(
                "duplicate action id {}",
                record.id
            )));
        }

        let latest = self
            .records
            .iter()
            .filter(|r| {
                r.facts.entity_type == record.facts.entity_type
                    && r.facts.entity_id == record.facts.entity_id
            })
            .map(|r| r.facts.created_at)
            .max();

        if let Some(latest) = latest {
            if record.facts.created_at <= latest {
                record.facts.created_at = latest + chrono::Duration::microseconds(1);
            }
        }

        self.records.push(record.clone());
        Ok(record)
    }

    fn find(&self, id: Uuid) -> Option<&ActionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn mark_reverted(&mut self, id: Uuid, annotation: RevertAnnotation) -> Result<ActionRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AuditError::NotFound { id })?;

        if record.is_reverted() {
            return Err(AuditError::AlreadyReverted { id });
        }

        record.annotation = annotation;
        Ok(record.clone())
    }

    fn has_later_unreverted(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        after: DateTime<Utc>,
    ) -> bool {
        self.records.iter().any(|r| {
            r.facts.entity_type == entity_type
                && r.facts.entity_id == entity_id
                && r.facts.created_at > after
                && !r.is_reverted()
        })
    }

    fn list(&self, filter: &RecordFilter, offset: usize, limit: usize) -> Vec<ActionRecord> {
        let mut matching: Vec<&ActionRecord> =
            self.records.iter().filter(|r| filter.matches(r)).collect();

        matching.sort_by(|a, b| {
            b.facts
                .created_at
                .cmp(&a.facts.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    fn count(&self, filter: &RecordFilter) -> u64 {
        self.records.iter().filter(|r| filter.matches(r)).count() as u64
    }
}

/// In-memory action log, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryActionLog {
    state: RwLock<LogState>,
}

impl InMemoryActionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record in insertion order.
    pub async fn records(&self) -> Vec<ActionRecord> {
        self.state.read().await.records.clone()
    }
}

#[async_trait]
impl ActionLogStore for InMemoryActionLog {
    async fn insert(&self, record: ActionRecord) -> Result<ActionRecord> {
        self.state.write().await.insert(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ActionRecord>> {
        Ok(self.state.read().await.find(id).cloned())
    }

    async fn mark_reverted(&self, id: Uuid, annotation: RevertAnnotation) -> Result<ActionRecord> {
        self.state.write().await.mark_reverted(id, annotation)
    }

    async fn has_later_unreverted(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .has_later_unreverted(entity_type, entity_id, after))
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ActionRecord>> {
        Ok(self.state.read().await.list(filter, offset, limit))
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64> {
        Ok(self.state.read().await.count(filter))
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Action log persisted as a JSON array in a single file.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new log on disk.
#[derive(Debug)]
pub struct JsonFileActionLog {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl JsonFileActionLog {
    /// Opens the log at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        debug!(path = %path.display(), "Opened action log");

        Ok(Self {
            path,
            state: Mutex::new(LogState { records }),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &LogState) -> Result<()> {
        let json = serde_json::to_vec_pretty(&state.records)?;
        let tmp = self.path.with_extension("json.tmp");

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| AuditError::Io { path, source }
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }
        tokio::fs::write(&tmp, json).await.map_err(io_err(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_err(&self.path))
    }
}

#[async_trait]
impl ActionLogStore for JsonFileActionLog {
    async fn insert(&self, record: ActionRecord) -> Result<ActionRecord> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let stored = next.insert(record)?;
        self.persist(&next).await?;
        *state = next;
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ActionRecord>> {
        Ok(self.state.lock().await.find(id).cloned())
    }

    async fn mark_reverted(&self, id: Uuid, annotation: RevertAnnotation) -> Result<ActionRecord> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let updated = next.mark_reverted(id, annotation)?;
        self.persist(&next).await?;
        *state = next;
        Ok(updated)
    }

    async fn has_later_unreverted(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .has_later_unreverted(entity_type, entity_id, after))
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ActionRecord>> {
        Ok(self.state.lock().await.list(filter, offset, limit))
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64> {
        Ok(self.state.lock().await.count(filter))
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ActionFacts;
    use kos_core::{ActionType, Actor};
    use serde_json::json;

    fn record(entity_id: Uuid, actor: &str, realm: &str) -> ActionRecord {
        ActionRecord::new(ActionFacts {
            actor: Actor::new(actor),
            action_type: ActionType::Update,
            entity_type: EntityType::Group,
            entity_id,
            entity_external_id: Some("kc-g".to_string()),
            entity_name: "engineering".to_string(),
            realm_name: realm.to_string(),
            realm_id: None,
            before_state: Some(json!({"name": "a"})),
            after_state: Some(json!({"name": "b"})),
            changed_fields: Some(vec!["name".to_string()]),
            revert_of_action_id: None,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_insert_keeps_created_at_strictly_increasing() {
        let store = InMemoryActionLog::new();
        let entity = Uuid::now_v7();

        let first = record(entity, "a", "acme");
        let mut second = record(entity, "a", "acme");
        second.facts.created_at = first.facts.created_at;

        let first = store.insert(first).await.unwrap();
        let second = store.insert(second).await.unwrap();
        assert!(second.facts.created_at > first.facts.created_at);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = InMemoryActionLog::new();
        let r = record(Uuid::now_v7(), "a", "acme");
        store.insert(r.clone()).await.unwrap();
        assert!(matches!(
            store.insert(r).await,
            Err(AuditError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_reverted_is_write_once() {
        let store = InMemoryActionLog::new();
        let r = store.insert(record(Uuid::now_v7(), "a", "acme")).await.unwrap();
        let annotation = RevertAnnotation::reverted_by(&Actor::new("b"), "undo");

        let updated = store.mark_reverted(r.id, annotation.clone()).await.unwrap();
        assert!(updated.is_reverted());
        assert_eq!(updated.facts, r.facts);

        let err = store.mark_reverted(r.id, annotation).await.unwrap_err();
        assert!(matches!(err, AuditError::AlreadyReverted { .. }));
    }

    #[tokio::test]
    async fn test_mark_reverted_unknown_id() {
        let store = InMemoryActionLog::new();
        let err = store
            .mark_reverted(Uuid::now_v7(), RevertAnnotation::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_has_later_unreverted() {
        let store = InMemoryActionLog::new();
        let entity = Uuid::now_v7();
        let first = store.insert(record(entity, "a", "acme")).await.unwrap();
        assert!(!store
            .has_later_unreverted(EntityType::Group, entity, first.facts.created_at)
            .await
            .unwrap());

        let second = store.insert(record(entity, "a", "acme")).await.unwrap();
        assert!(store
            .has_later_unreverted(EntityType::Group, entity, first.facts.created_at)
            .await
            .unwrap());

        // Other entity kinds with the same id do not count.
        assert!(!store
            .has_later_unreverted(EntityType::Client, entity, first.facts.created_at)
            .await
            .unwrap());

        store
            .mark_reverted(second.id, RevertAnnotation::reverted_by(&Actor::new("b"), "x"))
            .await
            .unwrap();
        assert!(!store
            .has_later_unreverted(EntityType::Group, entity, first.facts.created_at)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filters() {
        let store = InMemoryActionLog::new();
        let entity = Uuid::now_v7();
        let oldest = store.insert(record(entity, "alice", "acme")).await.unwrap();
        store.insert(record(Uuid::now_v7(), "bob", "acme")).await.unwrap();
        let newest = store.insert(record(entity, "alice", "globex")).await.unwrap();

        let all = store.list(&RecordFilter::All, 0, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, newest.id);
        assert_eq!(all[2].id, oldest.id);

        let alice = store
            .list(&RecordFilter::Actor("alice".to_string()), 0, 10)
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);

        let acme = RecordFilter::Realm("acme".to_string());
        assert_eq!(store.count(&acme).await.unwrap(), 2);

        let by_entity = RecordFilter::Entity {
            entity_type: EntityType::Group,
            entity_id: entity,
        };
        let page = store.list(&by_entity, 1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, oldest.id);
    }

    #[tokio::test]
    async fn test_json_file_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("actions.json");

        let store = JsonFileActionLog::open(&path).unwrap();
        let inserted = store.insert(record(Uuid::now_v7(), "a", "acme")).await.unwrap();
        store
            .mark_reverted(inserted.id, RevertAnnotation::reverted_by(&Actor::new("b"), "x"))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileActionLog::open(&path).unwrap();
        let loaded = reopened.find_by_id(inserted.id).await.unwrap().unwrap();
        assert!(loaded.is_reverted());
        assert_eq!(loaded.facts, inserted.facts);
        assert_eq!(reopened.name(), "json_file");
    }

    #[tokio::test]
    async fn test_json_file_log_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileActionLog::open(&path),
            Err(AuditError::Serialization(_))
        ));
    }
}
