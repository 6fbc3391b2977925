//! Kos CLI - inspect the action audit log and revert actions.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod state;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kos=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Audit(args) => commands::audit::run(&cli.state_dir, args).await,
        Commands::Revert(args) => commands::revert::run(&cli.state_dir, args).await,
        Commands::Version => {
            println!("kos {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
