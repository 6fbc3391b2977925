//! Local projection of Keycloak state for the Kos backend.
//!
//! Admin reads are served from this mirror rather than from Keycloak. The
//! revert engine writes compensating changes here after applying them to
//! the identity provider.
//!
//! # Example
//!
//! ```rust
//! use kos_core::KcRealm;
//! use kos_projection::{InMemoryProjection, RealmRepository};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let projection = InMemoryProjection::new();
//! projection.save(KcRealm::new("acme")).await.unwrap();
//! assert!(projection.find_by_name("acme").await.unwrap().is_some());
//! # });
//! ```

mod error;
mod memory;
mod repository;

pub use error::{ProjectionError, Result};
pub use memory::{InMemoryProjection, ProjectionCounts};
pub use repository::{ClientRepository, GroupRepository, RealmRepository, RoleRepository};
