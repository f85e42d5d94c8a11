//! Repository for migration sessions and the session status lookup.
//!
//! Status transitions are guarded: the `UPDATE` matches the expected
//! current status by name, so a concurrent transition race resolves to
//! "no row updated" instead of a lost update. Callers map the `None`
//! into an invalid-state error.

use sqlx::PgPool;
use stevedore_core::paging::{clamp_limit, clamp_offset, DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT};
use stevedore_core::types::{DbId, TenantId, Timestamp};
use stevedore_core::SessionStatus;

use crate::models::session::{
    CreateMigrationSession, ImportCounts, MigrationSession, MigrationSessionStatus,
    SessionListQuery, ValidationCounts,
};

/// Column list for `migration_session_statuses`.
const STATUS_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Column list for `migration_sessions`; `status` is the lookup name.
const SESSION_COLUMNS: &str = "s.id, s.tenant_id, s.user_id, s.source_type, s.source_name, \
     s.entities, st.name AS status, s.mapping_config, s.total_records, s.valid_records, \
     s.warning_records, s.error_records, s.imported_records, s.failed_records, \
     s.skipped_records, s.error_message, s.expires_at, s.created_at, s.updated_at";

/// Join resolving the status name. Also used over a data-modifying CTE
/// named `s`, so inserts and updates return the same row shape.
const SESSION_JOIN: &str = "JOIN migration_session_statuses st ON st.id = s.status_id";

// ── SessionRepo ──────────────────────────────────────────────────────

/// Provides CRUD operations and guarded status transitions for
/// migration sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a new session in 'created' status.
    pub async fn create(
        pool: &PgPool,
        tenant_id: TenantId,
        user_id: DbId,
        input: &CreateMigrationSession,
        expires_at: Timestamp,
    ) -> Result<MigrationSession, sqlx::Error> {
        let sql = format!(
            "WITH s AS ( \
                INSERT INTO migration_sessions \
                    (tenant_id, user_id, source_type, source_name, entities, status_id, expires_at) \
                VALUES ( \
                    $1, $2, $3, $4, $5, \
                    (SELECT id FROM migration_session_statuses WHERE name = 'created'), \
                    $6 \
                ) \
                RETURNING * \
             ) \
             SELECT {SESSION_COLUMNS} FROM s {SESSION_JOIN}"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .bind(&input.source_type)
            .bind(&input.source_name)
            .bind(&input.entities)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID, scoped to its tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<MigrationSession>, sqlx::Error> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM migration_sessions s {SESSION_JOIN} \
             WHERE s.id = $1 AND s.tenant_id = $2"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's sessions, newest first, optionally filtered by
    /// status name.
    pub async fn list(
        pool: &PgPool,
        tenant_id: TenantId,
        query: &SessionListQuery,
    ) -> Result<Vec<MigrationSession>, sqlx::Error> {
        let limit = clamp_limit(query.limit, DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT);
        let offset = clamp_offset(query.offset);
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM migration_sessions s {SESSION_JOIN} \
             WHERE s.tenant_id = $1 \
               AND ($2::TEXT IS NULL OR st.name = $2) \
             ORDER BY s.created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(tenant_id)
            .bind(&query.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Move a session from one status to another, by name, only if it is
    /// still in the expected one. Returns `None` when the guard fails
    /// (the session is missing or no longer in `from`).
    pub async fn transition(
        pool: &PgPool,
        tenant_id: TenantId,
        id: DbId,
        from: &str,
        to: &str,
    ) -> Result<Option<MigrationSession>, sqlx::Error> {
        let sql = format!(
            "WITH s AS ( \
                UPDATE migration_sessions SET \
                    status_id = (SELECT id FROM migration_session_statuses WHERE name = $4) \
                WHERE id = $1 AND tenant_id = $2 \
                  AND status_id = (SELECT id FROM migration_session_statuses WHERE name = $3) \
                RETURNING * \
             ) \
             SELECT {SESSION_COLUMNS} FROM s {SESSION_JOIN}"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(id)
            .bind(tenant_id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Replace the session's mapping config wholesale.
    pub async fn update_mapping_config(
        pool: &PgPool,
        tenant_id: TenantId,
        id: DbId,
        mapping_config: &serde_json::Value,
    ) -> Result<Option<MigrationSession>, sqlx::Error> {
        let sql = format!(
            "WITH s AS ( \
                UPDATE migration_sessions SET mapping_config = $3 \
                WHERE id = $1 AND tenant_id = $2 \
                RETURNING * \
             ) \
             SELECT {SESSION_COLUMNS} FROM s {SESSION_JOIN}"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(id)
            .bind(tenant_id)
            .bind(mapping_config)
            .fetch_optional(pool)
            .await
    }

    /// Write the aggregate counters after a validation run.
    pub async fn update_validation_counts(
        pool: &PgPool,
        id: DbId,
        counts: ValidationCounts,
    ) -> Result<Option<MigrationSession>, sqlx::Error> {
        let sql = format!(
            "WITH s AS ( \
                UPDATE migration_sessions SET \
                    total_records = $2, \
                    valid_records = $3, \
                    warning_records = $4, \
                    error_records = $5 \
                WHERE id = $1 \
                RETURNING * \
             ) \
             SELECT {SESSION_COLUMNS} FROM s {SESSION_JOIN}"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(id)
            .bind(counts.total)
            .bind(counts.valid)
            .bind(counts.warning)
            .bind(counts.error)
            .fetch_optional(pool)
            .await
    }

    /// Write the aggregate counters and error summary after a commit job.
    pub async fn update_import_counts(
        pool: &PgPool,
        id: DbId,
        counts: ImportCounts,
        error_message: Option<&str>,
    ) -> Result<Option<MigrationSession>, sqlx::Error> {
        let sql = format!(
            "WITH s AS ( \
                UPDATE migration_sessions SET \
                    imported_records = $2, \
                    failed_records = $3, \
                    skipped_records = $4, \
                    error_message = $5 \
                WHERE id = $1 \
                RETURNING * \
             ) \
             SELECT {SESSION_COLUMNS} FROM s {SESSION_JOIN}"
        );
        sqlx::query_as::<_, MigrationSession>(&sql)
            .bind(id)
            .bind(counts.imported)
            .bind(counts.failed)
            .bind(counts.skipped)
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a session; chunks, raw rows, validation records, and
    /// progress rows cascade. Returns whether a row was deleted.
    pub async fn delete(
        pool: &PgPool,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM migration_sessions WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete terminal sessions whose retention window has passed.
    /// Returns the number of sessions purged.
    pub async fn purge_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM migration_sessions \
             WHERE expires_at < $1 \
               AND status_id IN \
                   (SELECT id FROM migration_session_statuses WHERE name = ANY($2))",
        )
        .bind(now)
        .bind(SessionStatus::TERMINAL)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List all session statuses.
    pub async fn list_statuses(pool: &PgPool) -> Result<Vec<MigrationSessionStatus>, sqlx::Error> {
        let sql = format!("SELECT {STATUS_COLUMNS} FROM migration_session_statuses ORDER BY id");
        sqlx::query_as::<_, MigrationSessionStatus>(&sql)
            .fetch_all(pool)
            .await
    }
}
