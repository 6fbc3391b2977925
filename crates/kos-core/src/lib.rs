//! # Kos Core
//!
//! Core types shared by the Kos identity administration backend.
//!
//! This crate provides the foundational data structures used throughout the
//! workspace, including:
//!
//! - [`Actor`] - Who performed an administrative action
//! - [`ActionType`] / [`EntityType`] - What kind of action, on what kind of entity
//! - [`projection`] - Rows of the local relational mirror of Keycloak state
//!
//! ## Example
//!
//! ```rust
//! use kos_core::{ActionType, Actor, EntityType};
//!
//! let actor = Actor::new("8c1f4a52-admin").with_email("admin@example.com");
//! assert!(!actor.is_system());
//!
//! assert_eq!(ActionType::Create.inverse(), ActionType::Delete);
//! assert_eq!("ROLE".parse::<EntityType>().unwrap(), EntityType::Role);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod entity;
pub mod error;
pub mod projection;

pub use actor::{Actor, SYSTEM_ACTOR_ID};
pub use entity::{ActionType, EntityType};
pub use error::{CoreError, Result};
pub use projection::{KcClient, KcGroup, KcRealm, KcRole};
