//! Validation runs and the record preview.

use serde::Serialize;
use serde_json::Value;
use stevedore_core::error::CoreError;
use stevedore_core::mapping::apply_mapping;
use stevedore_core::paging::{clamp_limit, clamp_offset, DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT};
use stevedore_core::record::ValidationStatus;
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::validation::{check_row, classify, FieldIssue, VALIDATION_BATCH_SIZE};
use stevedore_core::SessionStatus;
use stevedore_db::models::record::{CreateValidationRecord, PreviewPage, PreviewQuery};
use stevedore_db::models::session::ValidationCounts;
use stevedore_db::repositories::chunk_repo::RawRowRepo;
use stevedore_db::repositories::record_repo::RecordRepo;
use stevedore_db::repositories::session_repo::SessionRepo;

use crate::error::EngineError;
use crate::mapping::entity_mapping;
use crate::sessions::parse_status;
use crate::{EngineResult, MigrationEngine};

/// Per-entity-type outcome of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct EntityValidationCounts {
    pub entity_type: String,
    pub valid: i64,
    pub warning: i64,
    pub error: i64,
}

impl MigrationEngine {
    /// Validate every entity type's raw rows against its confirmed
    /// mapping and target schema, replacing any prior run's records.
    ///
    /// Each entity type's new generation is swapped in atomically, so a
    /// preview never observes a half-written run. Per-record findings
    /// land in the validation records; the session's aggregate counters
    /// and the `ready_to_commit` transition happen at the end.
    pub async fn start_validation(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<Vec<EntityValidationCounts>> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        let current = parse_status(&session)?;
        current.require_one_of(
            &[
                SessionStatus::Mapped,
                SessionStatus::ReadyToCommit,
                SessionStatus::Validating,
            ],
            "mapped or ready_to_commit",
        )?;
        if current != SessionStatus::Validating {
            self.transition_required(
                tenant_id,
                session_id,
                current,
                SessionStatus::Validating,
                "mapped or ready_to_commit",
            )
            .await?;
        }

        let mut entity_types = session.entities.clone();
        entity_types.sort();

        let mut totals = ValidationCounts::default();
        let mut results = Vec::with_capacity(entity_types.len());
        for entity_type in &entity_types {
            let schema = self.catalog.schema_for(entity_type).await.ok_or_else(|| {
                CoreError::Validation(format!("unknown entity type '{entity_type}'"))
            })?;
            let mapping = entity_mapping(&session.mapping_config, entity_type)?;
            let generation = RecordRepo::next_generation(&self.pool, session_id, entity_type).await?;

            let mut records = Vec::new();
            let mut offset = 0i64;
            loop {
                let page = RawRowRepo::list_page(
                    &self.pool,
                    session_id,
                    entity_type,
                    VALIDATION_BATCH_SIZE as i64,
                    offset,
                )
                .await?;
                let page_len = page.len();
                for raw in &page {
                    let Value::Object(raw_map) = &raw.data else {
                        continue;
                    };
                    let mapped = apply_mapping(raw_map, &mapping);
                    let mut issues = check_row(&schema, &mapped);
                    if let Some(unique) = &schema.unique_field {
                        if let Some(Value::String(key)) = mapped.get(unique) {
                            let key = key.trim();
                            if !key.is_empty()
                                && self.reader.exists(tenant_id, entity_type, key).await
                            {
                                issues.push(FieldIssue::warning(
                                    unique.clone(),
                                    "probable_duplicate",
                                    format!(
                                        "a {entity_type} with {unique} '{key}' already exists"
                                    ),
                                ));
                            }
                        }
                    }
                    let status = classify(&issues);
                    records.push(CreateValidationRecord {
                        session_id,
                        entity_type: entity_type.clone(),
                        generation,
                        row_index: raw.row_index,
                        raw_data: raw.data.clone(),
                        mapped_data: Value::Object(mapped),
                        validation_status: status.as_str().to_string(),
                        validation_messages: serde_json::json!(issues),
                    });
                }
                if page_len < VALIDATION_BATCH_SIZE {
                    break;
                }
                offset += page_len as i64;
            }

            let retired =
                RecordRepo::replace_generation(&self.pool, session_id, entity_type, generation, &records)
                    .await?;
            let counts =
                RecordRepo::status_counts(&self.pool, session_id, Some(entity_type.as_str())).await?;
            totals.total += counts.total;
            totals.valid += counts.valid;
            totals.warning += counts.warning;
            totals.error += counts.error;
            tracing::info!(
                session_id,
                entity_type,
                generation,
                total = counts.total,
                valid = counts.valid,
                warning = counts.warning,
                error = counts.error,
                retired,
                "Entity type validated"
            );
            results.push(EntityValidationCounts {
                entity_type: entity_type.clone(),
                valid: counts.valid,
                warning: counts.warning,
                error: counts.error,
            });
        }

        SessionRepo::update_validation_counts(&self.pool, session_id, totals)
            .await?
            .ok_or_else(|| EngineError::not_found("MigrationSession", session_id))?;
        self.transition_required(
            tenant_id,
            session_id,
            SessionStatus::Validating,
            SessionStatus::ReadyToCommit,
            "validating",
        )
        .await?;
        Ok(results)
    }

    /// One page of validation records plus status counts, filtered by
    /// status and/or entity type.
    pub async fn get_preview(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        query: &PreviewQuery,
    ) -> EngineResult<PreviewPage> {
        self.get_session(tenant_id, session_id).await?;
        if let Some(status) = &query.status {
            if ValidationStatus::from_str(status).is_none() {
                return Err(
                    CoreError::Validation(format!("unknown status filter '{status}'")).into(),
                );
            }
        }

        let records = RecordRepo::list_preview(&self.pool, session_id, query).await?;
        let counts =
            RecordRepo::status_counts(&self.pool, session_id, query.entity_type.as_deref()).await?;
        Ok(PreviewPage {
            records,
            counts,
            limit: clamp_limit(query.limit, DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT),
            offset: clamp_offset(query.offset),
        })
    }
}
