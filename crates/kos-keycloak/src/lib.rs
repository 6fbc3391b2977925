//! # Kos Keycloak
//!
//! Keycloak admin REST client for the Kos identity administration backend.
//!
//! The revert engine never talks HTTP directly: it depends on the
//! [`IdpAdmin`] trait, which [`KeycloakAdminClient`] implements against a
//! live Keycloak server and test doubles implement in memory.
//!
//! ## Features
//!
//! - **Client, role and group administration**: the create/update/delete
//!   calls needed to compensate an administrative action
//! - **Admin authentication**: OAuth2 `client_credentials` with token caching,
//!   or a static bearer token
//! - **Typed errors**: 404, 409 and 401/403 map to distinct variants
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kos_keycloak::{ClientRepresentation, IdpAdmin, KeycloakAdminClient, KeycloakAuth, KeycloakConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = KeycloakConfig::new("https://sso.example.com")
//!         .with_auth(KeycloakAuth::client_credentials("kos-admin", "s3cret"));
//!     let client = KeycloakAdminClient::new(config)?;
//!
//!     let id = client.create_client("acme", &ClientRepresentation::new("acme-web")).await?;
//!     println!("created {id}");
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

mod admin;
mod client;
mod config;
mod error;
mod representation;
mod token;

pub use admin::IdpAdmin;
pub use client::KeycloakAdminClient;
pub use config::{KeycloakAuth, KeycloakConfig, TlsConfig, DEFAULT_ADMIN_REALM};
pub use error::{KeycloakError, Result};
pub use representation::{
    ClientRepresentation, GroupRepresentation, RoleRepresentation, TokenResponse,
};
