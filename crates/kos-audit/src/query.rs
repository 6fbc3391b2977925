//! Read-side queries over the action log.

use std::sync::Arc;

use kos_core::EntityType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::record::ActionRecord;
use crate::store::{ActionLogStore, RecordFilter};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page index, starting at 0.
    pub page: usize,
    /// Items per page, within `1..=100`.
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Creates a page request, clamping the size to `1..=100`.
    #[must_use]
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of items skipped before this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// A record together with its current revert eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// The stored record.
    #[serde(flatten)]
    pub record: ActionRecord,
    /// Whether the record could be reverted right now.
    pub can_revert: bool,
}

/// One page of audit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    /// Entries on this page, newest first.
    pub content: Vec<AuditEntry>,
    /// Page index.
    pub page: usize,
    /// Requested page size.
    pub size: usize,
    /// Matching records across all pages.
    pub total_elements: u64,
    /// Number of pages.
    pub total_pages: u64,
}

/// Read-only view over the action log.
#[derive(Debug, Clone)]
pub struct AuditQueryService {
    store: Arc<dyn ActionLogStore>,
}

impl AuditQueryService {
    /// Creates a query service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ActionLogStore>) -> Self {
        Self { store }
    }

    /// Actions performed by one actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn my_actions(&self, actor_id: &str, page: PageRequest) -> Result<AuditPage> {
        self.page(&RecordFilter::Actor(actor_id.to_string()), page)
            .await
    }

    /// Actions in one realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn realm_actions(&self, realm_name: &str, page: PageRequest) -> Result<AuditPage> {
        self.page(&RecordFilter::Realm(realm_name.to_string()), page)
            .await
    }

    /// History of one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn entity_actions(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        page: PageRequest,
    ) -> Result<AuditPage> {
        let filter = RecordFilter::Entity {
            entity_type,
            entity_id,
        };
        self.page(&filter, page).await
    }

    /// Actions on any entity of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn entity_type_actions(
        &self,
        entity_type: EntityType,
        page: PageRequest,
    ) -> Result<AuditPage> {
        self.page(&RecordFilter::EntityType(entity_type), page)
            .await
    }

    /// Actions that have not been reverted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn unreverted_actions(&self, page: PageRequest) -> Result<AuditPage> {
        self.page(&RecordFilter::Unreverted, page).await
    }

    /// Every action.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn all_actions(&self, page: PageRequest) -> Result<AuditPage> {
        self.page(&RecordFilter::All, page).await
    }

    /// One action with its eligibility, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get_action(&self, id: Uuid) -> Result<Option<AuditEntry>> {
        match self.store.find_by_id(id).await? {
            Some(record) => Ok(Some(self.entry(record).await?)),
            None => Ok(None),
        }
    }

    /// Whether the action could be reverted right now. Unknown ids are not
    /// revertible.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn can_revert(&self, id: Uuid) -> Result<bool> {
        match self.store.find_by_id(id).await? {
            Some(record) => self.is_eligible(&record).await,
            None => Ok(false),
        }
    }

    /// Applies the eligibility rule to a loaded record: not yet reverted,
    /// and no later unreverted action on the same entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn is_eligible(&self, record: &ActionRecord) -> Result<bool> {
        if record.is_reverted() {
            return Ok(false);
        }
        let superseded = self
            .store
            .has_later_unreverted(
                record.facts.entity_type,
                record.facts.entity_id,
                record.facts.created_at,
            )
            .await?;
        Ok(!superseded)
    }

    async fn entry(&self, record: ActionRecord) -> Result<AuditEntry> {
        let can_revert = self.is_eligible(&record).await?;
        Ok(AuditEntry { record, can_revert })
    }

    async fn page(&self, filter: &RecordFilter, request: PageRequest) -> Result<AuditPage> {
        let request = PageRequest::new(request.page, request.size);
        let total_elements = self.store.count(filter).await?;
        let records = self
            .store
            .list(filter, request.offset(), request.size)
            .await?;

        let mut content = Vec::with_capacity(records.len());
        for record in records {
            content.push(self.entry(record).await?);
        }

        Ok(AuditPage {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(request.size as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{ActionEntry, AuditRecorder};
    use crate::store::InMemoryActionLog;
    use kos_core::{ActionType, Actor};
    use serde_json::json;

    fn setup() -> (AuditRecorder, AuditQueryService) {
        let store: Arc<dyn ActionLogStore> = Arc::new(InMemoryActionLog::new());
        let recorder = AuditRecorder::builder().with_store(store.clone()).build();
        (recorder, AuditQueryService::new(store))
    }

    fn group_update(entity_id: Uuid, realm: &str, from: &str, to: &str) -> ActionEntry {
        ActionEntry::new(ActionType::Update, EntityType::Group, entity_id, to, realm)
            .external_id("kc-group")
            .before_state(&json!({"name": from}))
            .after_state(&json!({"name": to}))
    }

    #[test]
    fn test_page_request_defaults_and_clamping() {
        assert_eq!(PageRequest::default(), PageRequest { page: 0, size: 20 });
        assert_eq!(PageRequest::new(2, 0).size, 1);
        assert_eq!(PageRequest::new(2, 500).size, 100);
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }

    #[tokio::test]
    async fn test_two_updates_only_newest_is_revertible() {
        let (recorder, queries) = setup();
        let actor = Actor::new("admin-1");
        let group = Uuid::now_v7();

        let older = recorder
            .record(&actor, group_update(group, "acme", "a", "b"))
            .await
            .unwrap();
        let newer = recorder
            .record(&actor, group_update(group, "acme", "b", "c"))
            .await
            .unwrap();

        assert!(!queries.can_revert(older.id).await.unwrap());
        assert!(queries.can_revert(newer.id).await.unwrap());

        let history = queries
            .entity_actions(EntityType::Group, group, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total_elements, 2);
        assert_eq!(history.content[0].record.id, newer.id);
        assert!(history.content[0].can_revert);
        assert!(!history.content[1].can_revert);
    }

    #[tokio::test]
    async fn test_can_revert_unknown_id_is_false() {
        let (_, queries) = setup();
        assert!(!queries.can_revert(Uuid::now_v7()).await.unwrap());
        assert!(queries.get_action(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paging_totals() {
        let (recorder, queries) = setup();
        let actor = Actor::new("admin-1");
        for i in 0..5 {
            recorder
                .record(&actor, group_update(Uuid::now_v7(), "acme", "x", &format!("g{i}")))
                .await
                .unwrap();
        }

        let page = queries.all_actions(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[0].record.facts.entity_name, "g2");

        let last = queries.all_actions(PageRequest::new(2, 2)).await.unwrap();
        assert_eq!(last.content.len(), 1);
        assert_eq!(last.content[0].record.facts.entity_name, "g0");
    }

    #[tokio::test]
    async fn test_filters_by_actor_realm_and_kind() {
        let (recorder, queries) = setup();
        recorder
            .record(&Actor::new("alice"), group_update(Uuid::now_v7(), "acme", "a", "b"))
            .await
            .unwrap();
        recorder
            .record(&Actor::new("bob"), group_update(Uuid::now_v7(), "globex", "a", "b"))
            .await
            .unwrap();
        recorder
            .record_system(ActionEntry::new(
                ActionType::Create,
                EntityType::Client,
                Uuid::now_v7(),
                "acme-web",
                "acme",
            ))
            .await
            .unwrap();

        let page = PageRequest::default();
        assert_eq!(queries.my_actions("alice", page).await.unwrap().total_elements, 1);
        assert_eq!(queries.realm_actions("acme", page).await.unwrap().total_elements, 2);
        assert_eq!(
            queries
                .entity_type_actions(EntityType::Client, page)
                .await
                .unwrap()
                .total_elements,
            1
        );
        assert_eq!(queries.unreverted_actions(page).await.unwrap().total_elements, 3);
    }

    #[tokio::test]
    async fn test_entry_serializes_flat() {
        let (recorder, queries) = setup();
        let record = recorder
            .record(&Actor::new("alice"), group_update(Uuid::now_v7(), "acme", "a", "b"))
            .await
            .unwrap();

        let entry = queries.get_action(record.id).await.unwrap().unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["canRevert"], true);
        assert_eq!(json["entityType"], "GROUP");
        assert_eq!(json["changedFields"], json!(["name"]));
    }
}
