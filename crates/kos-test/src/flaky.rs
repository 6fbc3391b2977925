//! Store wrappers whose writes can be made to fail.
//!
//! Used to drive a revert into its late failure points, after Keycloak has
//! already accepted the compensating call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kos_audit::{
    ActionLogStore, ActionRecord, AuditError, InMemoryActionLog, RecordFilter, RevertAnnotation,
};
use kos_core::{EntityType, KcClient, KcGroup, KcRealm, KcRole};
use kos_projection::{
    ClientRepository, GroupRepository, InMemoryProjection, ProjectionError, RealmRepository,
    RoleRepository,
};
use uuid::Uuid;

/// Projection whose writes fail on demand. Reads always pass through.
#[derive(Debug, Default)]
pub struct FlakyProjection {
    inner: Arc<InMemoryProjection>,
    fail_writes: AtomicBool,
}

impl FlakyProjection {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<InMemoryProjection>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Turns write failures on or off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the wrapped projection.
    #[must_use]
    pub const fn inner(&self) -> &Arc<InMemoryProjection> {
        &self.inner
    }

    fn check_write(&self) -> kos_projection::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProjectionError::Store("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RealmRepository for FlakyProjection {
    async fn find_by_name(&self, realm_name: &str) -> kos_projection::Result<Option<KcRealm>> {
        self.inner.find_by_name(realm_name).await
    }

    async fn save(&self, realm: KcRealm) -> kos_projection::Result<KcRealm> {
        self.check_write()?;
        RealmRepository::save(self.inner.as_ref(), realm).await
    }
}

#[async_trait]
impl ClientRepository for FlakyProjection {
    async fn find_by_id(&self, id: Uuid) -> kos_projection::Result<Option<KcClient>> {
        ClientRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> kos_projection::Result<Option<KcClient>> {
        self.inner.find_by_client_id(realm_id, client_id).await
    }

    async fn save(&self, client: KcClient) -> kos_projection::Result<KcClient> {
        self.check_write()?;
        ClientRepository::save(self.inner.as_ref(), client).await
    }

    async fn delete_by_id(&self, id: Uuid) -> kos_projection::Result<bool> {
        self.check_write()?;
        ClientRepository::delete_by_id(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl RoleRepository for FlakyProjection {
    async fn find_by_id(&self, id: Uuid) -> kos_projection::Result<Option<KcRole>> {
        RoleRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn save(&self, role: KcRole) -> kos_projection::Result<KcRole> {
        self.check_write()?;
        RoleRepository::save(self.inner.as_ref(), role).await
    }

    async fn delete_by_id(&self, id: Uuid) -> kos_projection::Result<bool> {
        self.check_write()?;
        RoleRepository::delete_by_id(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl GroupRepository for FlakyProjection {
    async fn find_by_id(&self, id: Uuid) -> kos_projection::Result<Option<KcGroup>> {
        GroupRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn save(&self, group: KcGroup) -> kos_projection::Result<KcGroup> {
        self.check_write()?;
        GroupRepository::save(self.inner.as_ref(), group).await
    }

    async fn delete_by_id(&self, id: Uuid) -> kos_projection::Result<bool> {
        self.check_write()?;
        GroupRepository::delete_by_id(self.inner.as_ref(), id).await
    }
}

/// Action log whose inserts or annotations fail on demand.
#[derive(Debug, Default)]
pub struct FlakyActionLog {
    inner: InMemoryActionLog,
    fail_inserts: AtomicBool,
    fail_annotations: AtomicBool,
}

impl FlakyActionLog {
    /// Creates an empty log that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns insert failures on or off.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Turns `mark_reverted` failures on or off.
    pub fn fail_annotations(&self, fail: bool) {
        self.fail_annotations.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of every record in insertion order.
    pub async fn records(&self) -> Vec<ActionRecord> {
        self.inner.records().await
    }
}

#[async_trait]
impl ActionLogStore for FlakyActionLog {
    async fn insert(&self, record: ActionRecord) -> kos_audit::Result<ActionRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AuditError::Store("injected insert failure".to_string()));
        }
        self.inner.insert(record).await
    }

    async fn find_by_id(&self, id: Uuid) -> kos_audit::Result<Option<ActionRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn mark_reverted(
        &self,
        id: Uuid,
        annotation: RevertAnnotation,
    ) -> kos_audit::Result<ActionRecord> {
        if self.fail_annotations.load(Ordering::SeqCst) {
            return Err(AuditError::Store("injected annotation failure".to_string()));
        }
        self.inner.mark_reverted(id, annotation).await
    }

    async fn has_later_unreverted(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        after: DateTime<Utc>,
    ) -> kos_audit::Result<bool> {
        self.inner
            .has_later_unreverted(entity_type, entity_id, after)
            .await
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> kos_audit::Result<Vec<ActionRecord>> {
        self.inner.list(filter, offset, limit).await
    }

    async fn count(&self, filter: &RecordFilter) -> kos_audit::Result<u64> {
        self.inner.count(filter).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
