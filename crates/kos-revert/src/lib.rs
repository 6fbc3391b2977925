//! # Kos Revert
//!
//! Undoes audited administrative actions on Keycloak-backed entities.
//!
//! Given an action id, the [`RevertEngine`] checks that the action is still
//! the latest unreverted change on its entity, applies a compensating change
//! in Keycloak, mirrors it in the local projection, writes the inverse
//! action record and marks the original as reverted.
//!
//! ## Features
//!
//! - **Per-kind strategies**: [`CompensationStrategy`] implementations for
//!   clients, roles and groups, looked up in a [`StrategyRegistry`]
//! - **Typed rejections**: not found, already reverted, conflict, not
//!   revertible and not implemented are distinct [`RevertError`] variants
//! - **Divergence reporting**: a local failure after Keycloak changed is
//!   logged, counted and returned as [`RevertError::Diverged`]
//! - **Metrics**: `kos_revert_total{outcome}` via [`RevertMetrics`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kos_audit::{AuditRecorder, InMemoryActionLog};
//! use kos_core::Actor;
//! use kos_projection::InMemoryProjection;
//! use kos_revert::{RevertContext, RevertEngine};
//!
//! let recorder = AuditRecorder::new(Arc::new(InMemoryActionLog::new()));
//! let context = RevertContext::new(idp, Arc::new(InMemoryProjection::new()));
//! let engine = RevertEngine::new(recorder, context);
//!
//! let outcome = engine
//!     .revert(action_id, "created by mistake", &Actor::new("admin-1"))
//!     .await?;
//! println!("{}", outcome.message);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod metrics;
mod snapshot;
mod state;
mod strategies;
mod strategy;

pub use engine::{RevertEngine, RevertOutcome};
pub use error::{Result, RevertError};
pub use metrics::{MetricOutcome, RevertMetrics};
pub use snapshot::{ClientSnapshot, GroupSnapshot, RoleSnapshot, SnapshotError};
pub use state::RevertState;
pub use strategies::{ClientStrategy, GroupStrategy, RoleStrategy};
pub use strategy::{CompensationStrategy, ExternalEffect, RevertContext, StrategyRegistry};
