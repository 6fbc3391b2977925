//! Built-in compensation strategies.

mod client;
mod group;
mod role;

pub use client::ClientStrategy;
pub use group::GroupStrategy;
pub use role::RoleStrategy;
