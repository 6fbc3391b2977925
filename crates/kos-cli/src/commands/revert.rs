//! Revert command implementation.
//!
//! Reverts one action against a live Keycloak server, then writes the
//! updated projection back to the state directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use kos_audit::{AuditRecorder, TracingSink};
use kos_core::Actor;
use kos_keycloak::{KeycloakAdminClient, KeycloakAuth, KeycloakConfig, TlsConfig};
use kos_revert::{RevertContext, RevertEngine, RevertMetrics};
use tracing::info;
use uuid::Uuid;

use crate::state::StateDir;

/// Arguments for the revert command.
#[derive(Args)]
pub struct RevertArgs {
    /// Id of the action to revert
    pub id: Uuid,

    /// Why the action is being reverted
    #[arg(short, long)]
    pub reason: String,

    /// Keycloak id of the operator performing the revert
    #[arg(long, env = "KOS_ACTOR_ID")]
    pub actor_id: String,

    /// Email of the operator
    #[arg(long)]
    pub actor_email: Option<String>,

    /// Keycloak base URL (e.g., `<https://sso.example.com>`)
    #[arg(long, env = "KOS_KEYCLOAK_URL")]
    pub keycloak_url: String,

    /// Realm used to obtain the admin token
    #[arg(long, env = "KOS_KEYCLOAK_REALM", default_value = "master")]
    pub admin_realm: String,

    /// Client id for the client credentials grant
    #[arg(long, env = "KOS_KEYCLOAK_CLIENT_ID", requires = "client_secret")]
    pub client_id: Option<String>,

    /// Client secret for the client credentials grant
    #[arg(long, env = "KOS_KEYCLOAK_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Static bearer token, used instead of client credentials
    #[arg(long, env = "KOS_KEYCLOAK_TOKEN", hide_env_values = true, conflicts_with = "client_id")]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// CA certificate (PEM) to trust
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Print revert counters in Prometheus text format afterwards
    #[arg(long)]
    pub metrics: bool,
}

/// Runs the revert command.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded, Keycloak cannot be
/// configured, or the revert fails.
pub async fn run(state_dir: &Path, args: RevertArgs) -> Result<()> {
    let state = StateDir::new(state_dir);
    let log = Arc::new(state.open_log()?);
    let projection = Arc::new(state.open_projection()?);

    let idp = Arc::new(
        KeycloakAdminClient::new(keycloak_config(&args)?)
            .context("Failed to create Keycloak client")?,
    );

    let recorder = AuditRecorder::builder()
        .with_store(log)
        .with_sink(Arc::new(TracingSink::new()))
        .build();
    let metrics = Arc::new(RevertMetrics::new());
    let engine = RevertEngine::new(recorder, RevertContext::new(idp, projection.clone()))
        .with_metrics(metrics.clone());

    let mut actor = Actor::new(&args.actor_id);
    if let Some(email) = &args.actor_email {
        actor = actor.with_email(email);
    }

    info!(action_id = %args.id, actor = %actor.keycloak_id, "Reverting action");
    let result = engine.revert(args.id, &args.reason, &actor).await;

    // Local writes may have landed even if a later step failed.
    projection
        .persist()
        .await
        .context("Failed to save projection")?;

    if args.metrics {
        print!("{}", metrics.render().context("Failed to render metrics")?);
    }

    match result {
        Ok(outcome) => {
            println!("{}", outcome.message);
            if let Some(id) = outcome.new_action_id {
                println!("Recorded as action {id}");
            }
            Ok(())
        }
        Err(e) if e.is_diverged() => bail!(
            "Revert of {} left Keycloak and the local state out of sync: {e}",
            args.id
        ),
        Err(e) => bail!("Revert rejected ({}): {e}", e.status_code()),
    }
}

fn keycloak_config(args: &RevertArgs) -> Result<KeycloakConfig> {
    let auth = match (&args.token, &args.client_id, &args.client_secret) {
        (Some(token), _, _) => KeycloakAuth::bearer(token),
        (None, Some(id), Some(secret)) => KeycloakAuth::client_credentials(id, secret),
        _ => bail!("Either --token or --client-id with --client-secret is required"),
    };

    let mut tls = TlsConfig::new();
    if let Some(ca) = &args.ca_cert {
        tls = tls.with_ca_cert(ca);
    }
    if args.insecure {
        tls = tls.insecure();
    }

    Ok(KeycloakConfig::new(&args.keycloak_url)
        .with_admin_realm(&args.admin_realm)
        .with_auth(auth)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_tls(tls))
}
