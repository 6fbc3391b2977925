//! In-memory projection with optional JSON snapshot persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kos_core::{KcClient, KcGroup, KcRealm, KcRole};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ProjectionError, Result};
use crate::repository::{ClientRepository, GroupRepository, RealmRepository, RoleRepository};

#[derive(Debug, Default)]
struct ProjectionState {
    realms: BTreeMap<Uuid, KcRealm>,
    clients: BTreeMap<Uuid, KcClient>,
    roles: BTreeMap<Uuid, KcRole>,
    groups: BTreeMap<Uuid, KcGroup>,
}

/// On-disk form of the projection.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectionSnapshot {
    #[serde(default)]
    realms: Vec<KcRealm>,
    #[serde(default)]
    clients: Vec<KcClient>,
    #[serde(default)]
    roles: Vec<KcRole>,
    #[serde(default)]
    groups: Vec<KcGroup>,
}

impl From<ProjectionSnapshot> for ProjectionState {
    fn from(snapshot: ProjectionSnapshot) -> Self {
        Self {
            realms: snapshot.realms.into_iter().map(|r| (r.id, r)).collect(),
            clients: snapshot.clients.into_iter().map(|c| (c.id, c)).collect(),
            roles: snapshot.roles.into_iter().map(|r| (r.id, r)).collect(),
            groups: snapshot.groups.into_iter().map(|g| (g.id, g)).collect(),
        }
    }
}

impl From<&ProjectionState> for ProjectionSnapshot {
    fn from(state: &ProjectionState) -> Self {
        Self {
            realms: state.realms.values().cloned().collect(),
            clients: state.clients.values().cloned().collect(),
            roles: state.roles.values().cloned().collect(),
            groups: state.groups.values().cloned().collect(),
        }
    }
}

/// Row counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionCounts {
    /// Realm rows.
    pub realms: usize,
    /// Client rows.
    pub clients: usize,
    /// Role rows.
    pub roles: usize,
    /// Group rows.
    pub groups: usize,
}

/// Projection held in memory.
///
/// Implements every repository trait. When opened with [`Self::load`], the
/// projection remembers its file and [`Self::persist`] writes it back.
#[derive(Debug, Default)]
pub struct InMemoryProjection {
    state: RwLock<ProjectionState>,
    path: Option<PathBuf>,
}

impl InMemoryProjection {
    /// Creates an empty projection with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a projection snapshot from `path`, starting empty if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ProjectionError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content)?
        } else {
            ProjectionSnapshot::default()
        };

        let state = ProjectionState::from(snapshot);
        debug!(
            path = %path.display(),
            realms = state.realms.len(),
            clients = state.clients.len(),
            roles = state.roles.len(),
            groups = state.groups.len(),
            "Loaded projection"
        );

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the projection to its backing file via a temporary sibling and
    /// a rename. A projection without a file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&ProjectionSnapshot::from(&*state))?
        };

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ProjectionError::Io { path, source }
        };

        let tmp = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }
        tokio::fs::write(&tmp, json).await.map_err(io_err(&tmp))?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err(path))?;

        debug!(path = %path.display(), "Persisted projection");
        Ok(())
    }

    /// Returns the number of rows per kind.
    pub async fn counts(&self) -> ProjectionCounts {
        let state = self.state.read().await;
        ProjectionCounts {
            realms: state.realms.len(),
            clients: state.clients.len(),
            roles: state.roles.len(),
            groups: state.groups.len(),
        }
    }
}

#[async_trait]
impl RealmRepository for InMemoryProjection {
    async fn find_by_name(&self, realm_name: &str) -> Result<Option<KcRealm>> {
        Ok(self
            .state
            .read()
            .await
            .realms
            .values()
            .find(|r| r.realm_name == realm_name)
            .cloned())
    }

    async fn save(&self, realm: KcRealm) -> Result<KcRealm> {
        let mut state = self.state.write().await;
        if state
            .realms
            .values()
            .any(|r| r.realm_name == realm.realm_name && r.id != realm.id)
        {
            return Err(ProjectionError::Duplicate {
                entity: "realm",
                key: realm.realm_name,
            });
        }
        state.realms.insert(realm.id, realm.clone());
        Ok(realm)
    }
}

#[async_trait]
impl ClientRepository for InMemoryProjection {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcClient>> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn find_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> Result<Option<KcClient>> {
        Ok(self
            .state
            .read()
            .await
            .clients
            .values()
            .find(|c| c.realm_id == realm_id && c.client_id == client_id)
            .cloned())
    }

    async fn save(&self, client: KcClient) -> Result<KcClient> {
        let mut state = self.state.write().await;
        if state.clients.values().any(|c| {
            c.realm_id == client.realm_id && c.client_id == client.client_id && c.id != client.id
        }) {
            return Err(ProjectionError::Duplicate {
                entity: "client",
                key: client.client_id,
            });
        }
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.clients.remove(&id).is_some())
    }
}

#[async_trait]
impl RoleRepository for InMemoryProjection {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcRole>> {
        Ok(self.state.read().await.roles.get(&id).cloned())
    }

    async fn save(&self, role: KcRole) -> Result<KcRole> {
        self.state
            .write()
            .await
            .roles
            .insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.roles.remove(&id).is_some())
    }
}

#[async_trait]
impl GroupRepository for InMemoryProjection {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<KcGroup>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn save(&self, group: KcGroup) -> Result<KcGroup> {
        self.state
            .write()
            .await
            .groups
            .insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.groups.remove(&id).is_some())
    }
}
