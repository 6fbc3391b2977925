//! Compensation for role actions.
//!
//! A role snapshot with a `clientId` describes a client role; the id is the
//! local id of the owning client, which is resolved to the client's Keycloak
//! id before any client-role call.
//!
//! Keycloak offers no in-place rename for client roles here, so reverting a
//! client-role update deletes the current role and recreates it from the
//! earlier snapshot. Assignments of that role to users and groups are lost
//! in the process. If the delete succeeds and the recreate fails the role is
//! gone from Keycloak and the revert is reported as diverged.

use async_trait::async_trait;
use chrono::Utc;
use kos_audit::ActionRecord;
use kos_core::{ActionType, EntityType, KcClient, KcRole};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RevertError, Result};
use crate::snapshot::RoleSnapshot;
use crate::strategy::{
    after_state, before_state, external, internal, invalid, CompensationStrategy,
    ExternalEffect, RevertContext,
};

/// Reverts realm-role and client-role creates, deletes and updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleStrategy;

fn snapshot_of(record: &ActionRecord, state: &serde_json::Value) -> Result<RoleSnapshot> {
    RoleSnapshot::parse(state).map_err(|e| invalid(record, e.to_string()))
}

async fn find_client(
    ctx: &RevertContext,
    record: &ActionRecord,
    client_id: Uuid,
) -> Result<Option<KcClient>> {
    ctx.clients
        .find_by_id(client_id)
        .await
        .map_err(|e| internal(record, &e))
}

async fn require_client(
    ctx: &RevertContext,
    record: &ActionRecord,
    client_id: Uuid,
) -> Result<KcClient> {
    find_client(ctx, record, client_id)
        .await?
        .ok_or_else(|| RevertError::NotFound {
            what: format!("associated client {client_id}"),
        })
}

impl RoleStrategy {
    async fn revert_create(
        ctx: &RevertContext,
        record: &ActionRecord,
        realm_name: &str,
    ) -> Result<()> {
        let created = snapshot_of(record, after_state(record)?)?;

        match created.client_id {
            Some(client_id) => {
                // The owning client may already be gone, taking its roles with it.
                let Some(client) = find_client(ctx, record, client_id).await? else {
                    warn!(
                        action_id = %record.id,
                        %client_id,
                        role = %created.name,
                        "Owning client not found locally, skipping Keycloak delete"
                    );
                    return Ok(());
                };
                ctx.idp
                    .delete_client_role(realm_name, &client.keycloak_id, &created.name)
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, client = %client.client_id, role = %created.name, "Deleted client role");
            }
            None => {
                ctx.idp
                    .delete_realm_role(realm_name, &created.name)
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, role = %created.name, "Deleted realm role");
            }
        }
        Ok(())
    }

    async fn revert_delete(
        ctx: &RevertContext,
        record: &ActionRecord,
        realm_name: &str,
    ) -> Result<String> {
        let deleted = snapshot_of(record, before_state(record)?)?;
        let rep = deleted.to_representation();

        if let Some(client_id) = deleted.client_id {
            let client = require_client(ctx, record, client_id).await?;
            ctx.idp
                .create_client_role(realm_name, &client.keycloak_id, &rep)
                .await
                .map_err(|e| external(record, e))?;
            info!(action_id = %record.id, realm = realm_name, client = %client.client_id, role = %deleted.name, "Recreated client role");
            return Ok(format!("{}/{}", client.keycloak_id, deleted.name));
        }

        ctx.idp
            .create_realm_role(realm_name, &rep)
            .await
            .map_err(|e| external(record, e))?;
        // The role exists again from here on, so a failed lookup is no
        // longer a clean failure.
        let created = match ctx.idp.get_realm_role(realm_name, &deleted.name).await {
            Ok(created) => created,
            Err(e) => {
                error!(
                    action_id = %record.id,
                    realm = realm_name,
                    role = %deleted.name,
                    error = %e,
                    diverged = true,
                    "Realm role recreated but its id could not be read"
                );
                return Err(RevertError::Diverged {
                    action_id: record.id,
                    stage: "idp realm role lookup",
                    message: e.to_string(),
                });
            }
        };
        info!(action_id = %record.id, realm = realm_name, role = %deleted.name, "Recreated realm role");
        Ok(created.id.unwrap_or(deleted.name))
    }

    async fn revert_update(
        ctx: &RevertContext,
        record: &ActionRecord,
        realm_name: &str,
    ) -> Result<()> {
        let previous = snapshot_of(record, before_state(record)?)?;
        let current_name = record
            .facts
            .after_state
            .as_ref()
            .and_then(|state| state.get("name"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&previous.name)
            .to_string();
        let rep = previous.to_representation();

        let Some(client_id) = previous.client_id else {
            ctx.idp
                .update_realm_role(realm_name, &current_name, &rep)
                .await
                .map_err(|e| external(record, e))?;
            info!(action_id = %record.id, realm = realm_name, role = %current_name, "Restored realm role");
            return Ok(());
        };

        let client = require_client(ctx, record, client_id).await?;
        ctx.idp
            .delete_client_role(realm_name, &client.keycloak_id, &current_name)
            .await
            .map_err(|e| external(record, e))?;

        if let Err(e) = ctx
            .idp
            .create_client_role(realm_name, &client.keycloak_id, &rep)
            .await
        {
            error!(
                action_id = %record.id,
                realm = realm_name,
                client = %client.client_id,
                role = %current_name,
                error = %e,
                diverged = true,
                "Client role deleted but not recreated"
            );
            return Err(RevertError::Diverged {
                action_id: record.id,
                stage: "idp client role recreate",
                message: e.to_string(),
            });
        }
        info!(action_id = %record.id, realm = realm_name, client = %client.client_id, role = %previous.name, "Restored client role");
        Ok(())
    }
}

#[async_trait]
impl CompensationStrategy for RoleStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Role
    }

    fn label(&self) -> &'static str {
        "Role"
    }

    async fn compensate_external(
        &self,
        ctx: &RevertContext,
        record: &ActionRecord,
    ) -> Result<ExternalEffect> {
        let realm = ctx.realm(record).await?;
        let realm_name = realm.realm_name.clone();

        match record.facts.action_type {
            ActionType::Create => {
                Self::revert_create(ctx, record, &realm_name).await?;
                Ok(ExternalEffect::in_realm(realm))
            }
            ActionType::Delete => {
                let keycloak_id = Self::revert_delete(ctx, record, &realm_name).await?;
                Ok(ExternalEffect::recreated(realm, keycloak_id))
            }
            ActionType::Update => {
                Self::revert_update(ctx, record, &realm_name).await?;
                Ok(ExternalEffect::in_realm(realm))
            }
        }
    }

    async fn compensate_local(
        &self,
        ctx: &RevertContext,
        record: &ActionRecord,
        effect: &ExternalEffect,
    ) -> Result<()> {
        let entity_id = record.facts.entity_id;

        match record.facts.action_type {
            ActionType::Create => {
                let removed = ctx
                    .roles
                    .delete_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, removed, "Removed role row");
            }
            ActionType::Delete => {
                let deleted = snapshot_of(record, before_state(record)?)?;
                let keycloak_id = effect
                    .new_external_id
                    .clone()
                    .ok_or_else(|| invalid(record, "identity provider returned no role id"))?;
                let mut row = KcRole::new(
                    entity_id,
                    effect.realm.id,
                    deleted.client_id,
                    deleted.name,
                    keycloak_id,
                );
                row.description = deleted.description;
                ctx.roles
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Inserted role row");
            }
            ActionType::Update => {
                let Some(mut row) = ctx
                    .roles
                    .find_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?
                else {
                    debug!(action_id = %record.id, %entity_id, "Role row missing, nothing to restore locally");
                    return Ok(());
                };
                let previous = snapshot_of(record, before_state(record)?)?;
                // Client-role ids embed the role name.
                if row.is_client_role() {
                    if let Some((client_kc, _)) = row.keycloak_id.rsplit_once('/') {
                        row.keycloak_id = format!("{client_kc}/{}", previous.name);
                    }
                }
                row.name = previous.name;
                row.description = previous.description;
                row.updated_at = Some(Utc::now());
                ctx.roles
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Restored role row");
            }
        }
        Ok(())
    }
}
