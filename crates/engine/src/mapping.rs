//! Mapping suggestions and confirmed mapping configuration.

use serde_json::Value;
use stevedore_core::error::CoreError;
use stevedore_core::mapping::{self, FieldMapping, MappingSuggestions};
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::SessionStatus;
use stevedore_db::models::session::MigrationSession;
use stevedore_db::repositories::chunk_repo::UploadRepo;
use stevedore_db::repositories::record_repo::RecordRepo;
use stevedore_db::repositories::session_repo::SessionRepo;

use crate::error::EngineError;
use crate::sessions::parse_status;
use crate::{EngineResult, MigrationEngine};

/// Pull one entity type's confirmed mapping out of the session's
/// `mapping_config` object.
pub(crate) fn entity_mapping(
    config: &Value,
    entity_type: &str,
) -> Result<Vec<FieldMapping>, CoreError> {
    let raw = config.get(entity_type).ok_or_else(|| {
        CoreError::Validation(format!("no mapping configured for entity type '{entity_type}'"))
    })?;
    serde_json::from_value(raw.clone()).map_err(|e| {
        CoreError::Validation(format!("malformed mapping for entity type '{entity_type}': {e}"))
    })
}

impl MigrationEngine {
    /// Suggest source-to-target field mappings for one entity type,
    /// scored against the headers captured at assembly.
    pub async fn suggest_mapping(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        entity_type: &str,
    ) -> EngineResult<MappingSuggestions> {
        let session = self.get_session(tenant_id, session_id).await?;
        parse_status(&session)?.require_one_of(
            &[
                SessionStatus::UploadComplete,
                SessionStatus::Mapped,
                SessionStatus::Validating,
                SessionStatus::ReadyToCommit,
            ],
            "upload_complete or later",
        )?;
        if !session.entities.contains(&entity_type.to_string()) {
            return Err(CoreError::Validation(format!(
                "entity type '{entity_type}' is not part of this session"
            ))
            .into());
        }

        let upload = UploadRepo::find(&self.pool, session_id, entity_type)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!("no uploaded data for entity type '{entity_type}'"))
            })?;
        let schema = self
            .catalog
            .schema_for(entity_type)
            .await
            .ok_or_else(|| CoreError::Validation(format!("unknown entity type '{entity_type}'")))?;

        Ok(mapping::suggest(&upload.source_headers, &schema))
    }

    /// Confirm one entity type's field mapping.
    ///
    /// Replacing a mapping invalidates the entity type's validation
    /// results, so its records are dropped and a `ready_to_commit`
    /// session falls back to `mapped`. The session reaches `mapped` from
    /// `upload_complete` once every declared entity type has a mapping.
    pub async fn set_mapping(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        entity_type: &str,
        mapping: &[FieldMapping],
    ) -> EngineResult<MigrationSession> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        let current = parse_status(&session)?;
        current.require_one_of(
            &[
                SessionStatus::UploadComplete,
                SessionStatus::Mapped,
                SessionStatus::ReadyToCommit,
            ],
            "upload_complete, mapped, or ready_to_commit",
        )?;
        if !session.entities.contains(&entity_type.to_string()) {
            return Err(CoreError::Validation(format!(
                "entity type '{entity_type}' is not part of this session"
            ))
            .into());
        }
        let schema = self
            .catalog
            .schema_for(entity_type)
            .await
            .ok_or_else(|| CoreError::Validation(format!("unknown entity type '{entity_type}'")))?;
        mapping::validate_mapping(mapping, &schema).map_err(CoreError::Validation)?;

        let mut config = session.mapping_config.clone();
        if !config.is_object() {
            config = Value::Object(serde_json::Map::new());
        }
        if let Some(object) = config.as_object_mut() {
            object.insert(entity_type.to_string(), serde_json::json!(mapping));
        }

        // Stale validation results for this entity type are now wrong.
        let dropped =
            RecordRepo::delete_by_entity_type(&self.pool, session_id, entity_type).await?;
        if dropped > 0 {
            tracing::info!(
                session_id,
                entity_type,
                dropped,
                "Validation records invalidated by re-mapping"
            );
        }

        let updated =
            SessionRepo::update_mapping_config(&self.pool, tenant_id, session_id, &config)
                .await?
                .ok_or_else(|| EngineError::not_found("MigrationSession", session_id))?;

        match current {
            SessionStatus::ReadyToCommit => {
                self.transition_required(
                    tenant_id,
                    session_id,
                    SessionStatus::ReadyToCommit,
                    SessionStatus::Mapped,
                    "ready_to_commit",
                )
                .await
            }
            SessionStatus::UploadComplete if all_entities_mapped(&updated) => {
                self.transition_required(
                    tenant_id,
                    session_id,
                    SessionStatus::UploadComplete,
                    SessionStatus::Mapped,
                    "upload_complete",
                )
                .await
            }
            _ => Ok(updated),
        }
    }
}

/// Whether every declared entity type has a confirmed mapping.
fn all_entities_mapped(session: &MigrationSession) -> bool {
    session
        .entities
        .iter()
        .all(|entity_type| session.mapping_config.get(entity_type).is_some())
}
