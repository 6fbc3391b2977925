//! Action audit log for the Kos identity administration backend.
//!
//! This crate records every administrative mutation of a Keycloak-backed
//! entity (clients, roles, groups, identity providers) and answers the
//! questions operators ask before undoing one:
//! - What changed, who changed it, and what did the entity look like before?
//! - Is this action still the latest one on its entity, so that it can be
//!   reverted safely?
//!
//! # Features
//!
//! - [`ActionRecord`] split into immutable facts and a write-once revert
//!   annotation
//! - Shallow field diffs for updates ([`changed_fields`])
//! - Pluggable [`ActionLogStore`] backends (in-memory, JSON file)
//! - Read-side [`AuditQueryService`] with per-entry revert eligibility
//!
//! # Example
//!
//! ```rust
//! use kos_audit::{ActionEntry, AuditRecorder, InMemoryActionLog};
//! use kos_core::{ActionType, Actor, EntityType};
//! use serde_json::json;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # tokio_test_block_on(async {
//! let recorder = AuditRecorder::builder()
//!     .with_store(Arc::new(InMemoryActionLog::new()))
//!     .build();
//!
//! let entry = ActionEntry::new(ActionType::Update, EntityType::Client, Uuid::now_v7(), "acme-web", "acme")
//!     .before_state(&json!({"enabled": true}))
//!     .after_state(&json!({"enabled": false}));
//!
//! let record = recorder.record(&Actor::new("admin-1"), entry).await.unwrap();
//! assert_eq!(record.facts.changed_fields, Some(vec!["enabled".to_string()]));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod diff;
mod error;
mod query;
mod record;
mod recorder;
mod store;

pub use diff::changed_fields;
pub use error::{AuditError, Result};
pub use query::{
    AuditEntry, AuditPage, AuditQueryService, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use record::{ActionFacts, ActionRecord, RevertAnnotation};
pub use recorder::{ActionEntry, AuditRecorder, AuditRecorderBuilder, RecordSink, TracingSink};
pub use store::{ActionLogStore, InMemoryActionLog, JsonFileActionLog, RecordFilter};
