//! Repository for per-entity-type import progress.
//!
//! Progress rows are written after every attempted record, so a resumed
//! commit job is at most one record away from the durable truth.

use sqlx::PgPool;
use stevedore_core::types::DbId;

use crate::models::progress::ImportProgress;

/// Column list for `migration_import_progress`.
const PROGRESS_COLUMNS: &str = "id, session_id, entity_type, total_records, processed_records, \
     succeeded_records, failed_records, last_processed_offset, status, created_at, updated_at";

// ── ProgressRepo ─────────────────────────────────────────────────────

/// Provides progress bookkeeping for the commit orchestrator.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Open (or re-open) the progress row for an entity type at commit
    /// start. A resumed run refreshes the eligible total and goes back
    /// to 'running' but keeps its accumulated counters.
    pub async fn open(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        total_records: i64,
    ) -> Result<ImportProgress, sqlx::Error> {
        let sql = format!(
            "INSERT INTO migration_import_progress \
                (session_id, entity_type, total_records, status) \
             VALUES ($1, $2, $3, 'running') \
             ON CONFLICT (session_id, entity_type) \
                 DO UPDATE SET total_records = EXCLUDED.total_records, \
                               status = 'running' \
             RETURNING {PROGRESS_COLUMNS}"
        );
        sqlx::query_as::<_, ImportProgress>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .bind(total_records)
            .fetch_one(pool)
            .await
    }

    /// Account one attempted record and advance the resume offset.
    pub async fn record_attempt(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        record_id: DbId,
        succeeded: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_import_progress SET \
                processed_records = processed_records + 1, \
                succeeded_records = succeeded_records + $4, \
                failed_records = failed_records + $5, \
                last_processed_offset = $3 \
             WHERE session_id = $1 AND entity_type = $2",
        )
        .bind(session_id)
        .bind(entity_type)
        .bind(record_id)
        .bind(if succeeded { 1i64 } else { 0 })
        .bind(if succeeded { 0i64 } else { 1 })
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Set the progress status by name.
    pub async fn set_status(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        status: &str,
    ) -> Result<Option<ImportProgress>, sqlx::Error> {
        let sql = format!(
            "UPDATE migration_import_progress SET status = $3 \
             WHERE session_id = $1 AND entity_type = $2 \
             RETURNING {PROGRESS_COLUMNS}"
        );
        sqlx::query_as::<_, ImportProgress>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Find the progress row for one entity type.
    pub async fn find(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<Option<ImportProgress>, sqlx::Error> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM migration_import_progress \
             WHERE session_id = $1 AND entity_type = $2"
        );
        sqlx::query_as::<_, ImportProgress>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .fetch_optional(pool)
            .await
    }

    /// All progress rows for a session, by entity type.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ImportProgress>, sqlx::Error> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM migration_import_progress \
             WHERE session_id = $1 ORDER BY entity_type"
        );
        sqlx::query_as::<_, ImportProgress>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
