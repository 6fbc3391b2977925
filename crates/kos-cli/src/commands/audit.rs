//! Audit command implementation.
//!
//! Read-only queries over the action log.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use kos_audit::{AuditEntry, AuditPage, AuditQueryService, PageRequest, DEFAULT_PAGE_SIZE};
use kos_core::EntityType;
use uuid::Uuid;

use crate::state::StateDir;

/// Arguments for the audit command.
#[derive(Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands.
#[derive(Subcommand)]
pub enum AuditCommand {
    /// List actions, newest first
    List(ListArgs),

    /// Show one action
    Show {
        /// Action id
        id: Uuid,
    },

    /// Check whether an action can be reverted
    CanRevert {
        /// Action id
        id: Uuid,
    },
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per action
    #[default]
    Text,
    /// The page as JSON
    Json,
}

/// Arguments for `audit list`.
#[derive(Args)]
pub struct ListArgs {
    /// Only actions by this actor (Keycloak id)
    #[arg(long, conflicts_with_all = ["realm", "entity_type", "unreverted"])]
    pub actor: Option<String>,

    /// Only actions in this realm
    #[arg(long, conflicts_with_all = ["entity_type", "unreverted"])]
    pub realm: Option<String>,

    /// Only actions on this entity kind (CLIENT, ROLE, GROUP, IDP, REALM, USER)
    #[arg(long, conflicts_with = "unreverted")]
    pub entity_type: Option<String>,

    /// Only actions on this entity (requires --entity-type)
    #[arg(long, requires = "entity_type")]
    pub entity_id: Option<Uuid>,

    /// Only actions that have not been reverted
    #[arg(long)]
    pub unreverted: bool,

    /// Page number, starting at 0
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Page size (1-100)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub size: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Runs the audit command.
///
/// # Errors
///
/// Returns an error if the action log cannot be read or an argument is
/// invalid.
pub async fn run(state_dir: &Path, args: AuditArgs) -> Result<()> {
    let log = StateDir::new(state_dir).open_log()?;
    let queries = AuditQueryService::new(Arc::new(log));

    match args.command {
        AuditCommand::List(list) => {
            let page = list_page(&queries, &list).await?;
            match list.format {
                OutputFormat::Text => print_page(&page),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
            }
        }
        AuditCommand::Show { id } => {
            let Some(entry) = queries.get_action(id).await? else {
                bail!("Action {id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        AuditCommand::CanRevert { id } => {
            println!("{}", queries.can_revert(id).await?);
        }
    }
    Ok(())
}

async fn list_page(queries: &AuditQueryService, args: &ListArgs) -> Result<AuditPage> {
    let page = PageRequest::new(args.page, args.size);

    let result = if let Some(actor) = &args.actor {
        queries.my_actions(actor, page).await
    } else if let Some(realm) = &args.realm {
        queries.realm_actions(realm, page).await
    } else if let Some(raw) = &args.entity_type {
        let entity_type: EntityType = raw
            .parse()
            .with_context(|| format!("Invalid --entity-type '{raw}'"))?;
        match args.entity_id {
            Some(entity_id) => queries.entity_actions(entity_type, entity_id, page).await,
            None => queries.entity_type_actions(entity_type, page).await,
        }
    } else if args.unreverted {
        queries.unreverted_actions(page).await
    } else {
        queries.all_actions(page).await
    };

    result.context("Failed to query action log")
}

fn print_page(page: &AuditPage) {
    if page.content.is_empty() {
        println!("No actions found.");
        return;
    }

    for entry in &page.content {
        println!("{}", format_entry(entry));
    }
    println!();
    println!(
        "Page {} of {} ({} actions)",
        page.page + 1,
        page.total_pages.max(1),
        page.total_elements
    );
}

fn format_entry(entry: &AuditEntry) -> String {
    let facts = &entry.record.facts;
    let status = if entry.record.is_reverted() {
        "reverted"
    } else if entry.can_revert {
        "revertible"
    } else {
        "superseded"
    };
    let marker = if entry.record.is_revert() { " (revert)" } else { "" };

    format!(
        "{id}  {at}  {action:<6} {entity:<6} {name} [{realm}] by {actor}  {status}{marker}",
        id = entry.record.id,
        at = facts.created_at.format("%Y-%m-%d %H:%M:%S"),
        action = facts.action_type.as_str(),
        entity = facts.entity_type.as_str(),
        name = facts.entity_name,
        realm = facts.realm_name,
        actor = facts.actor.keycloak_id,
    )
}
