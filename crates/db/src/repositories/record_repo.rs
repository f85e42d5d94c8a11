//! Repository for validation records.
//!
//! A validation run writes its whole record set under a fresh
//! `generation` and deletes prior generations in the same transaction,
//! so preview readers never observe an empty window mid-swap. The
//! commit job reads eligible records in ascending `id` order, which is
//! what makes `last_processed_offset` an unambiguous resume point.

use sqlx::PgPool;
use stevedore_core::paging::{clamp_limit, clamp_offset, DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT};
use stevedore_core::types::DbId;

use crate::models::record::{
    BulkActionResult, CreateValidationRecord, PreviewQuery, StatusCounts, ValidationRecord,
};

/// Column list for `migration_validation_records`.
const RECORD_COLUMNS: &str = "id, session_id, entity_type, generation, row_index, raw_data, \
     mapped_data, fixed_data, validation_status, validation_messages, user_action, \
     created_at, updated_at";

/// Records the commit job may import: an explicit import or fix, or an
/// untouched row that validated at least to warning level.
const ELIGIBLE_PREDICATE: &str = "(user_action IN ('import', 'fix') \
     OR (user_action = 'pending' AND validation_status IN ('valid', 'warning')))";

// ── RecordRepo ───────────────────────────────────────────────────────

/// Provides validation-record persistence, preview reads, and per-record
/// decision updates.
pub struct RecordRepo;

impl RecordRepo {
    /// The generation number the next validation run should write under.
    pub async fn next_generation(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<i64, sqlx::Error> {
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(generation), 0) + 1 FROM migration_validation_records \
             WHERE session_id = $1 AND entity_type = $2",
        )
        .bind(session_id)
        .bind(entity_type)
        .fetch_one(pool)
        .await?;
        Ok(next)
    }

    /// Write a full validation run and retire every earlier generation
    /// for the entity type in one transaction (the atomic swap).
    pub async fn replace_generation(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        generation: i64,
        records: &[CreateValidationRecord],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for record in records {
            sqlx::query(
                "INSERT INTO migration_validation_records \
                    (session_id, entity_type, generation, row_index, raw_data, mapped_data, \
                     validation_status, validation_messages) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(record.session_id)
            .bind(&record.entity_type)
            .bind(record.generation)
            .bind(record.row_index)
            .bind(&record.raw_data)
            .bind(&record.mapped_data)
            .bind(&record.validation_status)
            .bind(&record.validation_messages)
            .execute(&mut *tx)
            .await?;
        }

        let deleted = sqlx::query(
            "DELETE FROM migration_validation_records \
             WHERE session_id = $1 AND entity_type = $2 AND generation < $3",
        )
        .bind(session_id)
        .bind(entity_type)
        .bind(generation)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected())
    }

    /// Drop all validation records for an entity type (mapping replaced;
    /// the results no longer describe anything).
    pub async fn delete_by_entity_type(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM migration_validation_records \
             WHERE session_id = $1 AND entity_type = $2",
        )
        .bind(session_id)
        .bind(entity_type)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find one record within a session.
    pub async fn find_by_id(
        pool: &PgPool,
        session_id: DbId,
        record_id: DbId,
    ) -> Result<Option<ValidationRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM migration_validation_records \
             WHERE id = $1 AND session_id = $2"
        );
        sqlx::query_as::<_, ValidationRecord>(&sql)
            .bind(record_id)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// One preview page, filtered by status and/or entity type, in
    /// (entity type, row) order.
    pub async fn list_preview(
        pool: &PgPool,
        session_id: DbId,
        query: &PreviewQuery,
    ) -> Result<Vec<ValidationRecord>, sqlx::Error> {
        let limit = clamp_limit(query.limit, DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT);
        let offset = clamp_offset(query.offset);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM migration_validation_records \
             WHERE session_id = $1 \
               AND ($2::TEXT IS NULL OR validation_status = $2) \
               AND ($3::TEXT IS NULL OR entity_type = $3) \
             ORDER BY entity_type, row_index \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, ValidationRecord>(&sql)
            .bind(session_id)
            .bind(&query.status)
            .bind(&query.entity_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Per-status counts for a session, optionally narrowed to one
    /// entity type.
    pub async fn status_counts(
        pool: &PgPool,
        session_id: DbId,
        entity_type: Option<&str>,
    ) -> Result<StatusCounts, sqlx::Error> {
        sqlx::query_as::<_, StatusCounts>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE validation_status = 'valid') AS valid, \
                COUNT(*) FILTER (WHERE validation_status = 'warning') AS warning, \
                COUNT(*) FILTER (WHERE validation_status = 'error') AS error \
             FROM migration_validation_records \
             WHERE session_id = $1 \
               AND ($2::TEXT IS NULL OR entity_type = $2)",
        )
        .bind(session_id)
        .bind(entity_type)
        .fetch_one(pool)
        .await
    }

    /// Set a record's action without touching its fix payload.
    pub async fn set_action(
        pool: &PgPool,
        session_id: DbId,
        record_id: DbId,
        action: &str,
    ) -> Result<Option<ValidationRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE migration_validation_records SET user_action = $3 \
             WHERE id = $1 AND session_id = $2 \
             RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, ValidationRecord>(&sql)
            .bind(record_id)
            .bind(session_id)
            .bind(action)
            .fetch_optional(pool)
            .await
    }

    /// Store an accepted fix: the replacement payload plus the record's
    /// refreshed status and messages from re-validation.
    pub async fn set_fix(
        pool: &PgPool,
        session_id: DbId,
        record_id: DbId,
        fixed_data: &serde_json::Value,
        validation_status: &str,
        validation_messages: &serde_json::Value,
    ) -> Result<Option<ValidationRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE migration_validation_records SET \
                user_action = 'fix', \
                fixed_data = $3, \
                validation_status = $4, \
                validation_messages = $5 \
             WHERE id = $1 AND session_id = $2 \
             RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, ValidationRecord>(&sql)
            .bind(record_id)
            .bind(session_id)
            .bind(fixed_data)
            .bind(validation_status)
            .bind(validation_messages)
            .fetch_optional(pool)
            .await
    }

    /// Apply one action to many records. Ids outside the session are
    /// skipped and counted, not fatal.
    pub async fn bulk_set_action(
        pool: &PgPool,
        session_id: DbId,
        record_ids: &[DbId],
        action: &str,
    ) -> Result<BulkActionResult, sqlx::Error> {
        if record_ids.is_empty() {
            return Ok(BulkActionResult::default());
        }
        let result = sqlx::query(
            "UPDATE migration_validation_records SET user_action = $3 \
             WHERE session_id = $1 AND id = ANY($2)",
        )
        .bind(session_id)
        .bind(record_ids)
        .bind(action)
        .execute(pool)
        .await?;
        let updated = result.rows_affected() as i64;
        Ok(BulkActionResult {
            updated_count: updated,
            skipped_count: record_ids.len() as i64 - updated,
        })
    }

    /// Count the records a commit job will attempt for an entity type.
    pub async fn count_eligible(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM migration_validation_records \
             WHERE session_id = $1 AND entity_type = $2 AND {ELIGIBLE_PREDICATE}"
        );
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(session_id)
            .bind(entity_type)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// One batch of eligible records strictly after `after_id`, in
    /// ascending id order.
    pub async fn list_eligible_page(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<ValidationRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM migration_validation_records \
             WHERE session_id = $1 AND entity_type = $2 AND id > $3 \
               AND {ELIGIBLE_PREDICATE} \
             ORDER BY id \
             LIMIT $4"
        );
        sqlx::query_as::<_, ValidationRecord>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Records left out of a commit: explicit skips plus untouched rows
    /// still at error level.
    pub async fn count_skipped(pool: &PgPool, session_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM migration_validation_records \
             WHERE session_id = $1 \
               AND (user_action = 'skip' \
                    OR (user_action = 'pending' AND validation_status = 'error'))",
        )
        .bind(session_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
