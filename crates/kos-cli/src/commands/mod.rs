//! CLI commands and argument parsing.

pub mod audit;
pub mod revert;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kos - audit log and revert engine for Keycloak administration
#[derive(Parser)]
#[command(name = "kos")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `actions.json` and `projection.json`
    #[arg(long, global = true, env = "KOS_STATE_DIR", default_value = ".kos")]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Query the action audit log
    Audit(audit::AuditArgs),

    /// Revert an action
    Revert(revert::RevertArgs),

    /// Print version information
    Version,
}
