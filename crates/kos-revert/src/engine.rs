//! The revert engine.
//!
//! A revert is a two-system saga with no transaction around it:
//!
//! 1. load the action and check eligibility
//! 2. apply the compensating change in Keycloak
//! 3. apply it to the local projection
//! 4. insert the inverse action record
//! 5. annotate the original record as reverted
//!
//! A failure in step 2 leaves both systems untouched. A failure in steps 3
//! to 5 leaves Keycloak changed and is reported as [`RevertError::Diverged`]
//! so an operator can reconcile by hand.
//!
//! Nothing locks the entity between step 1 and step 5. Two concurrent
//! reverts, or a revert racing a normal mutation, can both pass the
//! eligibility check. The store's `mark_reverted` refuses a second
//! annotation, which surfaces the loser as diverged rather than silently
//! double-reverting the log.

use std::sync::Arc;

use kos_audit::{
    ActionRecord, AuditError, AuditQueryService, AuditRecorder, RevertAnnotation,
};
use kos_core::{Actor, EntityType};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RevertError, Result};
use crate::metrics::{MetricOutcome, RevertMetrics};
use crate::state::RevertState;
use crate::strategy::{CompensationStrategy, RevertContext, StrategyRegistry};

/// Result of a successful revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertOutcome {
    /// Always true for a returned outcome; failures are errors.
    pub success: bool,
    /// Human-readable summary, e.g. `Client deleted (reverted CREATE)`.
    pub message: String,
    /// Id of the inverse action record.
    pub new_action_id: Option<Uuid>,
}

/// Reverts audited actions by applying compensating changes.
#[derive(Debug, Clone)]
pub struct RevertEngine {
    recorder: AuditRecorder,
    queries: AuditQueryService,
    registry: StrategyRegistry,
    context: RevertContext,
    metrics: Option<Arc<RevertMetrics>>,
}

impl RevertEngine {
    /// Creates an engine with the default strategies.
    ///
    /// Eligibility is read from the recorder's store.
    #[must_use]
    pub fn new(recorder: AuditRecorder, context: RevertContext) -> Self {
        let queries = AuditQueryService::new(recorder.store().clone());
        Self {
            recorder,
            queries,
            registry: StrategyRegistry::with_defaults(),
            context,
            metrics: None,
        }
    }

    /// Replaces the strategy registry.
    #[must_use]
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Counts outcomes in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<RevertMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the strategy registry.
    #[must_use]
    pub const fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Runs every rejection check without changing anything, in order:
    /// missing action, already reverted, later unreverted action on the same
    /// entity, entity kind never revertible, no strategy for the kind.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a rejection.
    pub async fn check_eligibility(&self, action_id: Uuid) -> Result<ActionRecord> {
        self.eligible(action_id).await.map(|(record, _)| record)
    }

    /// Reverts an action on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the action cannot be reverted,
    /// [`RevertError::External`] if Keycloak refuses the compensating
    /// change, or [`RevertError::Diverged`] if Keycloak was changed but a
    /// later write failed.
    pub async fn revert(
        &self,
        action_id: Uuid,
        reason: &str,
        actor: &Actor,
    ) -> Result<RevertOutcome> {
        let result = self.run(action_id, reason, actor).await;

        let outcome = match &result {
            Ok(_) => MetricOutcome::Done,
            Err(e) if e.is_diverged() => MetricOutcome::Diverged,
            Err(e) if e.is_rejection() => MetricOutcome::Rejected,
            Err(_) => MetricOutcome::Failed,
        };
        if let Some(metrics) = &self.metrics {
            metrics.observe(outcome);
        }

        result
    }

    async fn run(&self, action_id: Uuid, reason: &str, actor: &Actor) -> Result<RevertOutcome> {
        let mut state = RevertState::Pending;
        debug!(action_id = %action_id, state = %state, "Revert requested");

        let (record, strategy) = match self.eligible(action_id).await {
            Ok(found) => found,
            Err(e) => {
                if e.is_rejection() {
                    advance(action_id, &mut state, RevertState::Rejected);
                    info!(action_id = %action_id, error = %e, "Revert rejected");
                }
                return Err(e);
            }
        };
        advance(action_id, &mut state, RevertState::Eligible);
        advance(action_id, &mut state, RevertState::Compensating);

        match self.compensate(&record, strategy.as_ref(), reason, actor).await {
            Ok(outcome) => {
                advance(action_id, &mut state, RevertState::Done);
                info!(
                    action_id = %action_id,
                    entity_type = %record.facts.entity_type,
                    entity_id = %record.facts.entity_id,
                    actor = %actor.keycloak_id,
                    new_action_id = ?outcome.new_action_id,
                    "Action reverted"
                );
                Ok(outcome)
            }
            Err(e) => {
                advance(action_id, &mut state, RevertState::Failed);
                if !e.is_diverged() {
                    warn!(action_id = %action_id, error = %e, "Revert failed");
                }
                Err(e)
            }
        }
    }

    async fn eligible(
        &self,
        action_id: Uuid,
    ) -> Result<(ActionRecord, Arc<dyn CompensationStrategy>)> {
        let store_err = |e: AuditError| {
            error!(action_id = %action_id, error = %e, "Failed to read action log");
            RevertError::Internal {
                action_id,
                message: e.to_string(),
            }
        };

        let record = self
            .recorder
            .store()
            .find_by_id(action_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| RevertError::NotFound {
                what: format!("action {action_id}"),
            })?;

        if record.is_reverted() {
            return Err(RevertError::AlreadyReverted { action_id });
        }

        if !self.queries.is_eligible(&record).await.map_err(store_err)? {
            return Err(RevertError::Conflict { action_id });
        }

        let entity_type = record.facts.entity_type;
        match entity_type {
            EntityType::Realm => {
                return Err(RevertError::NotRevertible {
                    entity_type,
                    reason: "realm actions cannot be undone",
                })
            }
            EntityType::User => {
                return Err(RevertError::NotRevertible {
                    entity_type,
                    reason: "user actions are reverted through user management",
                })
            }
            _ => {}
        }

        let strategy = self
            .registry
            .get(entity_type)
            .ok_or(RevertError::NotImplemented { entity_type })?;

        Ok((record, strategy))
    }

    async fn compensate(
        &self,
        record: &ActionRecord,
        strategy: &dyn CompensationStrategy,
        reason: &str,
        actor: &Actor,
    ) -> Result<RevertOutcome> {
        let effect = strategy.compensate_external(&self.context, record).await?;

        // Keycloak has changed from here on.
        strategy
            .compensate_local(&self.context, record, &effect)
            .await
            .map_err(|e| diverged(record, "local projection", &e))?;

        let mut inverse = record.inverse_facts(actor);
        if let Some(new_id) = &effect.new_external_id {
            inverse.entity_external_id = Some(new_id.clone());
        }
        let inverse = self
            .recorder
            .record_facts(inverse)
            .await
            .map_err(|e| diverged(record, "inverse record", &e))?;

        self.recorder
            .store()
            .mark_reverted(record.id, RevertAnnotation::reverted_by(actor, reason))
            .await
            .map_err(|e| diverged(record, "revert annotation", &e))?;

        Ok(RevertOutcome {
            success: true,
            message: strategy.outcome_message(record.facts.action_type),
            new_action_id: Some(inverse.id),
        })
    }
}

fn advance(action_id: Uuid, state: &mut RevertState, next: RevertState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal revert transition {state} -> {next}"
    );
    debug!(action_id = %action_id, from = %state, to = %next, "Revert state changed");
    *state = next;
}

fn diverged(
    record: &ActionRecord,
    stage: &'static str,
    error: &dyn std::fmt::Display,
) -> RevertError {
    error!(
        action_id = %record.id,
        entity_type = %record.facts.entity_type,
        entity_id = %record.facts.entity_id,
        stage,
        error = %error,
        diverged = true,
        "Keycloak was changed but the revert could not be completed"
    );
    RevertError::Diverged {
        action_id: record.id,
        stage,
        message: error.to_string(),
    }
}
