//! Repository traits over the local projection.
//!
//! `save` is an upsert keyed by the row's local id. `delete_by_id` reports
//! whether a row was removed.

use std::fmt::Debug;

use async_trait::async_trait;
use kos_core::{KcClient, KcGroup, KcRealm, KcRole};
use uuid::Uuid;

use crate::error::Result;

/// Realm rows.
#[async_trait]
pub trait RealmRepository: Send + Sync + Debug {
    /// Looks up a realm by its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_name(&self, realm_name: &str) -> Result<Option<KcRealm>>;

    /// Inserts or replaces a realm.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProjectionError::Duplicate`] if another realm has the
    /// same name.
    async fn save(&self, realm: KcRealm) -> Result<KcRealm>;
}

/// Client rows.
#[async_trait]
pub trait ClientRepository: Send + Sync + Debug {
    /// Looks up a client by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcClient>>;

    /// Looks up a client by its OAuth client id within a realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_client_id(&self, realm_id: Uuid, client_id: &str)
        -> Result<Option<KcClient>>;

    /// Inserts or replaces a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn save(&self, client: KcClient) -> Result<KcClient>;

    /// Deletes a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

/// Role rows.
#[async_trait]
pub trait RoleRepository: Send + Sync + Debug {
    /// Looks up a role by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcRole>>;

    /// Inserts or replaces a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn save(&self, role: KcRole) -> Result<KcRole>;

    /// Deletes a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

/// Group rows.
#[async_trait]
pub trait GroupRepository: Send + Sync + Debug {
    /// Looks up a group by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcGroup>>;

    /// Inserts or replaces a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn save(&self, group: KcGroup) -> Result<KcGroup>;

    /// Deletes a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}
