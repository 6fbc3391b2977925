//! Compensation for client actions.

use async_trait::async_trait;
use chrono::Utc;
use kos_audit::ActionRecord;
use kos_core::{ActionType, EntityType, KcClient};
use tracing::{debug, info};

use crate::error::Result;
use crate::snapshot::ClientSnapshot;
use crate::strategy::{
    before_state, external, external_id, internal, invalid, CompensationStrategy, ExternalEffect,
    RevertContext,
};

/// Reverts client creates, deletes and updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientStrategy;

fn restored(record: &ActionRecord) -> Result<ClientSnapshot> {
    ClientSnapshot::parse(before_state(record)?).map_err(|e| invalid(record, e.to_string()))
}

#[async_trait]
impl CompensationStrategy for ClientStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Client
    }

    fn label(&self) -> &'static str {
        "Client"
    }

    async fn compensate_external(
        &self,
        ctx: &RevertContext,
        record: &ActionRecord,
    ) -> Result<ExternalEffect> {
        let realm = ctx.realm(record).await?;
        let realm_name = realm.realm_name.as_str();

        match record.facts.action_type {
            ActionType::Create => {
                let id = external_id(record)?;
                ctx.idp
                    .delete_client(realm_name, id)
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, keycloak_id = id, "Deleted client");
                Ok(ExternalEffect::in_realm(realm))
            }
            ActionType::Delete => {
                let snapshot = restored(record)?;
                let new_id = ctx
                    .idp
                    .create_client(realm_name, &snapshot.to_representation())
                    .await
                    .map_err(|e| external(record, e))?;
                info!(
                    action_id = %record.id,
                    realm = realm_name,
                    client_id = %snapshot.client_id,
                    keycloak_id = %new_id,
                    "Recreated client"
                );
                Ok(ExternalEffect::recreated(realm, new_id))
            }
            ActionType::Update => {
                let id = external_id(record)?;
                let snapshot = restored(record)?;
                ctx.idp
                    .update_client(realm_name, id, &snapshot.to_representation())
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, keycloak_id = id, "Restored client");
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
                    .clients
                    .delete_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, removed, "Removed client row");
            }
            ActionType::Delete => {
                let snapshot = restored(record)?;
                let keycloak_id = effect
                    .new_external_id
                    .clone()
                    .ok_or_else(|| invalid(record, "identity provider returned no client id"))?;
                let mut row = KcClient::new(
                    entity_id,
                    effect.realm.id,
                    snapshot.client_id.clone(),
                    keycloak_id,
                );
                snapshot.apply_to(&mut row);
                row.updated_at = None;
                ctx.clients
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Inserted client row");
            }
            ActionType::Update => {
                let Some(mut row) = ctx
                    .clients
                    .find_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?
                else {
                    debug!(action_id = %record.id, %entity_id, "Client row missing, nothing to restore locally");
                    return Ok(());
                };
                restored(record)?.apply_to(&mut row);
                row.synced_at = Utc::now();
                ctx.clients
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Restored client row");
            }
        }
        Ok(())
    }
}
