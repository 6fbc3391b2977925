//! Compensation for group actions. Only top-level groups are handled;
//! subgroups are not recreated.

use async_trait::async_trait;
use chrono::Utc;
use kos_audit::ActionRecord;
use kos_core::{ActionType, EntityType, KcGroup};
use tracing::{debug, info};

use crate::error::Result;
use crate::snapshot::GroupSnapshot;
use crate::strategy::{
    before_state, external, external_id, internal, invalid, CompensationStrategy, ExternalEffect,
    RevertContext,
};

/// Reverts group creates, deletes and updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupStrategy;

fn restored(record: &ActionRecord) -> Result<GroupSnapshot> {
    GroupSnapshot::parse(before_state(record)?).map_err(|e| invalid(record, e.to_string()))
}

#[async_trait]
impl CompensationStrategy for GroupStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Group
    }

    fn label(&self) -> &'static str {
        "Group"
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
                    .delete_group(realm_name, id)
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, keycloak_id = id, "Deleted group");
                Ok(ExternalEffect::in_realm(realm))
            }
            ActionType::Delete => {
                let snapshot = restored(record)?;
                let new_id = ctx
                    .idp
                    .create_group(realm_name, &snapshot.to_representation())
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, group = %snapshot.name, keycloak_id = %new_id, "Recreated group");
                Ok(ExternalEffect::recreated(realm, new_id))
            }
            ActionType::Update => {
                let id = external_id(record)?;
                let snapshot = restored(record)?;
                ctx.idp
                    .update_group(realm_name, id, &snapshot.to_representation())
                    .await
                    .map_err(|e| external(record, e))?;
                info!(action_id = %record.id, realm = realm_name, keycloak_id = id, "Restored group");
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
                    .groups
                    .delete_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, removed, "Removed group row");
            }
            ActionType::Delete => {
                let snapshot = restored(record)?;
                let keycloak_id = effect
                    .new_external_id
                    .clone()
                    .ok_or_else(|| invalid(record, "identity provider returned no group id"))?;
                let row = KcGroup::top_level(entity_id, effect.realm.id, snapshot.name, keycloak_id);
                ctx.groups
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Inserted group row");
            }
            ActionType::Update => {
                let Some(mut row) = ctx
                    .groups
                    .find_by_id(entity_id)
                    .await
                    .map_err(|e| internal(record, &e))?
                else {
                    debug!(action_id = %record.id, %entity_id, "Group row missing, nothing to restore locally");
                    return Ok(());
                };
                let snapshot = restored(record)?;
                if let Some(path) = snapshot.path {
                    row.path = path;
                }
                row.name = snapshot.name;
                row.updated_at = Some(Utc::now());
                ctx.groups
                    .save(row)
                    .await
                    .map_err(|e| internal(record, &e))?;
                debug!(action_id = %record.id, %entity_id, "Restored group row");
            }
        }
        Ok(())
    }
}
