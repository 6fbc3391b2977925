//! The identity-provider admin operations Kos depends on.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;
use crate::representation::{ClientRepresentation, GroupRepresentation, RoleRepresentation};

/// Admin operations against the identity provider.
///
/// Every call addresses a realm by name. Clients and groups are addressed by
/// their Keycloak id; realm roles by name; client roles by the owning client's
/// Keycloak id and the role name.
#[async_trait]
pub trait IdpAdmin: Send + Sync + Debug {
    /// Creates a client and returns its Keycloak id.
    async fn create_client(&self, realm: &str, client: &ClientRepresentation) -> Result<String>;

    /// Replaces a client's configuration.
    async fn update_client(
        &self,
        realm: &str,
        external_id: &str,
        client: &ClientRepresentation,
    ) -> Result<()>;

    /// Deletes a client.
    async fn delete_client(&self, realm: &str, external_id: &str) -> Result<()>;

    /// Creates a realm role.
    async fn create_realm_role(&self, realm: &str, role: &RoleRepresentation) -> Result<()>;

    /// Fetches a realm role by name.
    async fn get_realm_role(&self, realm: &str, name: &str) -> Result<RoleRepresentation>;

    /// Updates the realm role currently called `name`.
    async fn update_realm_role(
        &self,
        realm: &str,
        name: &str,
        role: &RoleRepresentation,
    ) -> Result<()>;

    /// Deletes a realm role by name.
    async fn delete_realm_role(&self, realm: &str, name: &str) -> Result<()>;

    /// Creates a role on a client.
    async fn create_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        role: &RoleRepresentation,
    ) -> Result<()>;

    /// Deletes a role from a client.
    async fn delete_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        name: &str,
    ) -> Result<()>;

    /// Creates a top-level group and returns its Keycloak id.
    async fn create_group(&self, realm: &str, group: &GroupRepresentation) -> Result<String>;

    /// Updates a group.
    async fn update_group(
        &self,
        realm: &str,
        external_id: &str,
        group: &GroupRepresentation,
    ) -> Result<()>;

    /// Deletes a group.
    async fn delete_group(&self, realm: &str, external_id: &str) -> Result<()>;
}
