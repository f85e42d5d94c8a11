//! Per-record and bulk user decisions on validation records.

use serde_json::Value;
use stevedore_core::error::CoreError;
use stevedore_core::record::UserAction;
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::validation::{check_row, classify};
use stevedore_core::SessionStatus;
use stevedore_db::models::record::{BulkActionResult, ValidationRecord};
use stevedore_db::repositories::record_repo::RecordRepo;

use crate::error::EngineError;
use crate::sessions::parse_status;
use crate::{EngineResult, MigrationEngine};

impl MigrationEngine {
    /// Record the user's decision for one record.
    ///
    /// `Fix` carries a full replacement payload which must pass the
    /// per-field checks before it is accepted; a payload still at error
    /// level is rejected with [`CoreError::StillInvalid`] and nothing is
    /// stored. The duplicate probe is not re-run for fixes; an accepted
    /// fix's status and messages come from the field checks alone.
    pub async fn set_record_action(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        record_id: DbId,
        action: UserAction,
        fixed_data: Option<Value>,
    ) -> EngineResult<ValidationRecord> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        parse_status(&session)?
            .require_one_of(&[SessionStatus::ReadyToCommit], "ready_to_commit")?;
        let record = RecordRepo::find_by_id(&self.pool, session_id, record_id)
            .await?
            .ok_or_else(|| EngineError::not_found("ValidationRecord", record_id))?;

        if action != UserAction::Fix {
            if fixed_data.is_some() {
                return Err(CoreError::Validation(
                    "fixedData is only accepted with action 'fix'".to_string(),
                )
                .into());
            }
            let updated = RecordRepo::set_action(&self.pool, session_id, record_id, action.as_str())
                .await?
                .ok_or_else(|| EngineError::not_found("ValidationRecord", record_id))?;
            tracing::debug!(session_id, record_id, action = %action, "Record action set");
            return Ok(updated);
        }

        let payload = fixed_data.ok_or_else(|| {
            CoreError::Validation("action 'fix' requires fixedData".to_string())
        })?;
        let Value::Object(fixed_map) = &payload else {
            return Err(
                CoreError::Validation("fixedData must be a JSON object".to_string()).into(),
            );
        };
        let schema = self
            .catalog
            .schema_for(&record.entity_type)
            .await
            .ok_or_else(|| {
                CoreError::Validation(format!("unknown entity type '{}'", record.entity_type))
            })?;

        let issues = check_row(&schema, fixed_map);
        let status = classify(&issues);
        if status == stevedore_core::record::ValidationStatus::Error {
            return Err(CoreError::StillInvalid { issues }.into());
        }

        let updated = RecordRepo::set_fix(
            &self.pool,
            session_id,
            record_id,
            &payload,
            status.as_str(),
            &serde_json::json!(issues),
        )
        .await?
        .ok_or_else(|| EngineError::not_found("ValidationRecord", record_id))?;
        tracing::debug!(session_id, record_id, status = %status, "Record fix accepted");
        Ok(updated)
    }

    /// Apply `import` or `skip` to many records at once. `Fix` is
    /// per-record by nature (each fix carries its own payload) and is
    /// rejected here.
    pub async fn bulk_set_record_action(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        record_ids: &[DbId],
        action: UserAction,
    ) -> EngineResult<BulkActionResult> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        parse_status(&session)?
            .require_one_of(&[SessionStatus::ReadyToCommit], "ready_to_commit")?;
        if action == UserAction::Fix {
            return Err(CoreError::Validation(
                "bulk updates cannot apply 'fix'; fixes carry per-record payloads".to_string(),
            )
            .into());
        }

        let result =
            RecordRepo::bulk_set_action(&self.pool, session_id, record_ids, action.as_str())
                .await?;
        tracing::info!(
            session_id,
            action = %action,
            updated = result.updated_count,
            skipped = result.skipped_count,
            "Bulk record action applied"
        );
        Ok(result)
    }
}
