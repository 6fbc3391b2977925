//! # Kos Test
//!
//! Test support for Kos revert flows.
//!
//! This crate provides:
//!
//! - [`MockIdp`] - an in-memory Keycloak admin API that records calls and
//!   fails on demand
//! - [`FlakyProjection`] and [`FlakyActionLog`] - stores whose writes can be
//!   made to fail, to reach the late failure points of a revert
//! - [`MockActor`], [`ActionFixture`] and snapshot/row fixtures
//!
//! ## Example
//!
//! ```rust
//! use kos_test::{client_state, ActionFixture, MockActor};
//!
//! let record = ActionFixture::client_create("acme-web")
//!     .actor(MockActor::operator())
//!     .build();
//! assert_eq!(record.facts.after_state, Some(client_state("acme-web")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod mock_idp;

pub use fixtures::{
    client_state, group_state, role_state, seed_client, seed_group, seed_realm, seed_role,
    ActionFixture, MockActor, TEST_REALM,
};
pub use flaky::{FlakyActionLog, FlakyProjection};
pub use mock_idp::{IdpCall, IdpOperation, MockIdp};
