//! Local state files used by the CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use kos_audit::JsonFileActionLog;
use kos_projection::InMemoryProjection;

const ACTIONS_FILE: &str = "actions.json";
const PROJECTION_FILE: &str = "projection.json";

/// The directory holding the action log and the projection snapshot.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn actions_path(&self) -> PathBuf {
        self.root.join(ACTIONS_FILE)
    }

    pub fn projection_path(&self) -> PathBuf {
        self.root.join(PROJECTION_FILE)
    }

    /// Opens the action log, starting empty if the file does not exist.
    pub fn open_log(&self) -> Result<JsonFileActionLog> {
        let path = self.actions_path();
        JsonFileActionLog::open(&path)
            .with_context(|| format!("Failed to open action log {}", path.display()))
    }

    /// Loads the projection, starting empty if the file does not exist.
    pub fn open_projection(&self) -> Result<InMemoryProjection> {
        let path = self.projection_path();
        InMemoryProjection::load(&path)
            .with_context(|| format!("Failed to load projection {}", path.display()))
    }
}
