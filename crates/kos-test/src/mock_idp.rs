//! In-memory stand-in for the Keycloak admin API.
//!
//! [`MockIdp`] records every call it receives, hands out sequential ids
//! (`kc-1`, `kc-2`, ...) for created resources and can be told to fail a
//! given operation.
//!
//! # Examples
//!
//! ```rust
//! use kos_keycloak::IdpAdmin;
//! use kos_test::{IdpOperation, MockIdp};
//!
//! # tokio_block_on(async {
//! let idp = MockIdp::new();
//! idp.fail_on(IdpOperation::DeleteClient);
//!
//! assert!(idp.delete_client("acme", "kc-9").await.is_err());
//! assert_eq!(idp.operations(), vec![IdpOperation::DeleteClient]);
//! # });
//! # fn tokio_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use kos_keycloak::{
    ClientRepresentation, GroupRepresentation, IdpAdmin, KeycloakError, Result,
    RoleRepresentation,
};
use parking_lot::Mutex;

/// Kind of admin call, used for failure injection and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdpOperation {
    /// `create_client`
    CreateClient,
    /// `update_client`
    UpdateClient,
    /// `delete_client`
    DeleteClient,
    /// `create_realm_role`
    CreateRealmRole,
    /// `get_realm_role`
    GetRealmRole,
    /// `update_realm_role`
    UpdateRealmRole,
    /// `delete_realm_role`
    DeleteRealmRole,
    /// `create_client_role`
    CreateClientRole,
    /// `delete_client_role`
    DeleteClientRole,
    /// `create_group`
    CreateGroup,
    /// `update_group`
    UpdateGroup,
    /// `delete_group`
    DeleteGroup,
}

/// A call received by the mock, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpCall {
    /// Client created.
    CreateClient {
        /// Realm name.
        realm: String,
        /// Representation sent.
        rep: ClientRepresentation,
    },
    /// Client updated.
    UpdateClient {
        /// Realm name.
        realm: String,
        /// Client id in Keycloak.
        id: String,
        /// Representation sent.
        rep: ClientRepresentation,
    },
    /// Client deleted.
    DeleteClient {
        /// Realm name.
        realm: String,
        /// Client id in Keycloak.
        id: String,
    },
    /// Realm role created.
    CreateRealmRole {
        /// Realm name.
        realm: String,
        /// Representation sent.
        rep: RoleRepresentation,
    },
    /// Realm role fetched.
    GetRealmRole {
        /// Realm name.
        realm: String,
        /// Role name.
        name: String,
    },
    /// Realm role updated.
    UpdateRealmRole {
        /// Realm name.
        realm: String,
        /// Role name addressed.
        name: String,
        /// Representation sent.
        rep: RoleRepresentation,
    },
    /// Realm role deleted.
    DeleteRealmRole {
        /// Realm name.
        realm: String,
        /// Role name.
        name: String,
    },
    /// Client role created.
    CreateClientRole {
        /// Realm name.
        realm: String,
        /// Owning client id in Keycloak.
        client: String,
        /// Representation sent.
        rep: RoleRepresentation,
    },
    /// Client role deleted.
    DeleteClientRole {
        /// Realm name.
        realm: String,
        /// Owning client id in Keycloak.
        client: String,
        /// Role name.
        name: String,
    },
    /// Group created.
    CreateGroup {
        /// Realm name.
        realm: String,
        /// Representation sent.
        rep: GroupRepresentation,
    },
    /// Group updated.
    UpdateGroup {
        /// Realm name.
        realm: String,
        /// Group id in Keycloak.
        id: String,
        /// Representation sent.
        rep: GroupRepresentation,
    },
    /// Group deleted.
    DeleteGroup {
        /// Realm name.
        realm: String,
        /// Group id in Keycloak.
        id: String,
    },
}

impl IdpCall {
    /// Returns the operation kind.
    #[must_use]
    pub const fn operation(&self) -> IdpOperation {
        match self {
            Self::CreateClient { .. } => IdpOperation::CreateClient,
            Self::UpdateClient { .. } => IdpOperation::UpdateClient,
            Self::DeleteClient { .. } => IdpOperation::DeleteClient,
            Self::CreateRealmRole { .. } => IdpOperation::CreateRealmRole,
            Self::GetRealmRole { .. } => IdpOperation::GetRealmRole,
            Self::UpdateRealmRole { .. } => IdpOperation::UpdateRealmRole,
            Self::DeleteRealmRole { .. } => IdpOperation::DeleteRealmRole,
            Self::CreateClientRole { .. } => IdpOperation::CreateClientRole,
            Self::DeleteClientRole { .. } => IdpOperation::DeleteClientRole,
            Self::CreateGroup { .. } => IdpOperation::CreateGroup,
            Self::UpdateGroup { .. } => IdpOperation::UpdateGroup,
            Self::DeleteGroup { .. } => IdpOperation::DeleteGroup,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<IdpCall>,
    failing: HashSet<IdpOperation>,
    next_id: u64,
    realm_role_ids: HashMap<(String, String), String>,
    omit_role_ids: bool,
}

impl MockState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("kc-{}", self.next_id)
    }
}

/// Recording, failure-injecting [`IdpAdmin`] implementation.
#[derive(Debug, Default)]
pub struct MockIdp {
    state: Mutex<MockState>,
}

impl MockIdp {
    /// Creates a mock that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with a 503.
    pub fn fail_on(&self, operation: IdpOperation) {
        self.state.lock().failing.insert(operation);
    }

    /// Stops failing `operation`.
    pub fn recover(&self, operation: IdpOperation) {
        self.state.lock().failing.remove(&operation);
    }

    /// Makes `get_realm_role` return roles without an id, as some Keycloak
    /// versions do.
    pub fn omit_role_ids(&self) {
        self.state.lock().omit_role_ids = true;
    }

    /// Returns every call received so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> Vec<IdpCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the operation kinds received so far.
    #[must_use]
    pub fn operations(&self) -> Vec<IdpOperation> {
        self.state.lock().calls.iter().map(IdpCall::operation).collect()
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Records `call` and returns the injected failure, if any.
    fn receive(&self, call: IdpCall) -> Result<()> {
        let mut state = self.state.lock();
        let operation = call.operation();
        state.calls.push(call);
        if state.failing.contains(&operation) {
            return Err(KeycloakError::HttpError {
                status: 503,
                message: format!("injected failure for {operation:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdpAdmin for MockIdp {
    async fn create_client(&self, realm: &str, rep: &ClientRepresentation) -> Result<String> {
        self.receive(IdpCall::CreateClient {
            realm: realm.to_string(),
            rep: rep.clone(),
        })?;
        Ok(self.state.lock().next_id())
    }

    async fn update_client(
        &self,
        realm: &str,
        external_id: &str,
        rep: &ClientRepresentation,
    ) -> Result<()> {
        self.receive(IdpCall::UpdateClient {
            realm: realm.to_string(),
            id: external_id.to_string(),
            rep: rep.clone(),
        })
    }

    async fn delete_client(&self, realm: &str, external_id: &str) -> Result<()> {
        self.receive(IdpCall::DeleteClient {
            realm: realm.to_string(),
            id: external_id.to_string(),
        })
    }

    async fn create_realm_role(&self, realm: &str, rep: &RoleRepresentation) -> Result<()> {
        self.receive(IdpCall::CreateRealmRole {
            realm: realm.to_string(),
            rep: rep.clone(),
        })?;
        let mut state = self.state.lock();
        let id = state.next_id();
        state
            .realm_role_ids
            .insert((realm.to_string(), rep.name.clone()), id);
        Ok(())
    }

    async fn get_realm_role(&self, realm: &str, name: &str) -> Result<RoleRepresentation> {
        self.receive(IdpCall::GetRealmRole {
            realm: realm.to_string(),
            name: name.to_string(),
        })?;
        let state = self.state.lock();
        let id = state
            .realm_role_ids
            .get(&(realm.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KeycloakError::NotFound {
                resource: format!("role {name}"),
            })?;

        let mut rep = RoleRepresentation::new(name, None);
        if !state.omit_role_ids {
            rep.id = Some(id);
        }
        Ok(rep)
    }

    async fn update_realm_role(
        &self,
        realm: &str,
        name: &str,
        rep: &RoleRepresentation,
    ) -> Result<()> {
        self.receive(IdpCall::UpdateRealmRole {
            realm: realm.to_string(),
            name: name.to_string(),
            rep: rep.clone(),
        })
    }

    async fn delete_realm_role(&self, realm: &str, name: &str) -> Result<()> {
        self.receive(IdpCall::DeleteRealmRole {
            realm: realm.to_string(),
            name: name.to_string(),
        })?;
        self.state
            .lock()
            .realm_role_ids
            .remove(&(realm.to_string(), name.to_string()));
        Ok(())
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        rep: &RoleRepresentation,
    ) -> Result<()> {
        self.receive(IdpCall::CreateClientRole {
            realm: realm.to_string(),
            client: client_external_id.to_string(),
            rep: rep.clone(),
        })
    }

    async fn delete_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        name: &str,
    ) -> Result<()> {
        self.receive(IdpCall::DeleteClientRole {
            realm: realm.to_string(),
            client: client_external_id.to_string(),
            name: name.to_string(),
        })
    }

    async fn create_group(&self, realm: &str, rep: &GroupRepresentation) -> Result<String> {
        self.receive(IdpCall::CreateGroup {
            realm: realm.to_string(),
            rep: rep.clone(),
        })?;
        Ok(self.state.lock().next_id())
    }

    async fn update_group(
        &self,
        realm: &str,
        external_id: &str,
        rep: &GroupRepresentation,
    ) -> Result<()> {
        self.receive(IdpCall::UpdateGroup {
            realm: realm.to_string(),
            id: external_id.to_string(),
            rep: rep.clone(),
        })
    }

    async fn delete_group(&self, realm: &str, external_id: &str) -> Result<()> {
        self.receive(IdpCall::DeleteGroup {
            realm: realm.to_string(),
            id: external_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let idp = MockIdp::new();
        let first = idp
            .create_client("acme", &ClientRepresentation::new("a"))
            .await
            .unwrap();
        let second = idp
            .create_group("acme", &GroupRepresentation::top_level("ops"))
            .await
            .unwrap();
        assert_eq!(first, "kc-1");
        assert_eq!(second, "kc-2");
    }

    #[tokio::test]
    async fn test_failure_injection_and_recovery() {
        let idp = MockIdp::new();
        idp.fail_on(IdpOperation::UpdateGroup);

        let rep = GroupRepresentation::top_level("ops");
        let err = idp.update_group("acme", "g-1", &rep).await.unwrap_err();
        assert_eq!(err.status(), Some(503));

        idp.recover(IdpOperation::UpdateGroup);
        idp.update_group("acme", "g-1", &rep).await.unwrap();
        assert_eq!(idp.call_count(), 2);
    }

    #[tokio::test]
    async fn test_realm_role_lookup() {
        let idp = MockIdp::new();
        idp.create_realm_role("acme", &RoleRepresentation::new("viewer", None))
            .await
            .unwrap();

        let role = idp.get_realm_role("acme", "viewer").await.unwrap();
        assert_eq!(role.id.as_deref(), Some("kc-1"));
        assert!(idp.get_realm_role("acme", "editor").await.unwrap_err().is_not_found());

        idp.omit_role_ids();
        let role = idp.get_realm_role("acme", "viewer").await.unwrap();
        assert!(role.id.is_none());
    }
}
