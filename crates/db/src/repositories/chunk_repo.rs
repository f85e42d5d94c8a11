//! Repositories for upload chunks, upload bookkeeping, and raw rows.
//!
//! Chunk storage is upsert-based so re-delivery of the same
//! (session, entity type, chunk index) overwrites instead of erroring,
//! and the per-entity-type `migration_uploads` row pins the chunk total
//! declared by whichever writer got there first.

use sqlx::PgPool;
use stevedore_core::types::{DbId, TenantId};

use crate::models::chunk::{
    AssembledDataset, MigrationChunk, MigrationRawRow, MigrationUpload, PutChunk,
};

/// Column list for `migration_chunks`.
const CHUNK_COLUMNS: &str =
    "id, session_id, entity_type, chunk_index, total_chunks, payload, created_at, updated_at";

/// Column list for `migration_uploads`.
const UPLOAD_COLUMNS: &str = "id, session_id, entity_type, total_chunks, source_headers, \
     row_count, created_at, updated_at";

/// Column list for `migration_raw_rows`.
const RAW_ROW_COLUMNS: &str =
    "id, session_id, entity_type, row_index, data, created_at, updated_at";

// ── UploadRepo ───────────────────────────────────────────────────────

/// Per-(session, entity type) upload bookkeeping.
pub struct UploadRepo;

impl UploadRepo {
    /// Record the chunk total for an entity type. First writer wins: a
    /// concurrent or repeat call returns the existing row untouched, so
    /// the caller can compare totals.
    pub async fn claim_total(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        total_chunks: i32,
    ) -> Result<MigrationUpload, sqlx::Error> {
        let sql = format!(
            "INSERT INTO migration_uploads (session_id, entity_type, total_chunks) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (session_id, entity_type) \
                 DO UPDATE SET total_chunks = migration_uploads.total_chunks \
             RETURNING {UPLOAD_COLUMNS}"
        );
        sqlx::query_as::<_, MigrationUpload>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .bind(total_chunks)
            .fetch_one(pool)
            .await
    }

    /// Find the bookkeeping row for one entity type.
    pub async fn find(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<Option<MigrationUpload>, sqlx::Error> {
        let sql = format!(
            "SELECT {UPLOAD_COLUMNS} FROM migration_uploads \
             WHERE session_id = $1 AND entity_type = $2"
        );
        sqlx::query_as::<_, MigrationUpload>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .fetch_optional(pool)
            .await
    }

    /// List all bookkeeping rows for a session, by entity type.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<MigrationUpload>, sqlx::Error> {
        let sql = format!(
            "SELECT {UPLOAD_COLUMNS} FROM migration_uploads \
             WHERE session_id = $1 ORDER BY entity_type"
        );
        sqlx::query_as::<_, MigrationUpload>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}

// ── ChunkRepo ────────────────────────────────────────────────────────

/// Transient chunk storage; rows disappear at assembly time.
pub struct ChunkRepo;

impl ChunkRepo {
    /// Store one chunk. Re-delivery of the same index overwrites the
    /// prior payload (idempotent re-upload).
    pub async fn upsert(pool: &PgPool, input: &PutChunk) -> Result<MigrationChunk, sqlx::Error> {
        let sql = format!(
            "INSERT INTO migration_chunks \
                (session_id, entity_type, chunk_index, total_chunks, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (session_id, entity_type, chunk_index) \
                 DO UPDATE SET payload = EXCLUDED.payload, \
                               total_chunks = EXCLUDED.total_chunks \
             RETURNING {CHUNK_COLUMNS}"
        );
        sqlx::query_as::<_, MigrationChunk>(&sql)
            .bind(input.session_id)
            .bind(&input.entity_type)
            .bind(input.chunk_index)
            .bind(input.total_chunks)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Count the distinct chunk indexes received for an entity type.
    /// The unique constraint makes a plain count sufficient.
    pub async fn count_received(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM migration_chunks \
             WHERE session_id = $1 AND entity_type = $2",
        )
        .bind(session_id)
        .bind(entity_type)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// The chunk indexes received for an entity type, ascending.
    pub async fn received_indexes(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<Vec<i32>, sqlx::Error> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            "SELECT chunk_index FROM migration_chunks \
             WHERE session_id = $1 AND entity_type = $2 \
             ORDER BY chunk_index",
        )
        .bind(session_id)
        .bind(entity_type)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(i,)| i).collect())
    }

    /// Fetch all chunks for one entity type in chunk order, for assembly.
    pub async fn list_for_assembly(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<Vec<MigrationChunk>, sqlx::Error> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM migration_chunks \
             WHERE session_id = $1 AND entity_type = $2 \
             ORDER BY chunk_index"
        );
        sqlx::query_as::<_, MigrationChunk>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .fetch_all(pool)
            .await
    }
}

// ── RawRowRepo ───────────────────────────────────────────────────────

/// Assembled raw rows, the durable form of an upload.
pub struct RawRowRepo;

impl RawRowRepo {
    /// Persist every assembled dataset, stamp the upload bookkeeping,
    /// drop the session's chunks, and advance the session
    /// `uploading → upload_complete`, all in one transaction.
    ///
    /// Returns `false` (and rolls back) when the session is not in
    /// 'uploading' — the guard failing means a concurrent transition won.
    pub async fn persist_assembly(
        pool: &PgPool,
        tenant_id: TenantId,
        session_id: DbId,
        datasets: &[AssembledDataset],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Claim the transition first; everything below is pointless if
        // another caller already moved the session on.
        let claimed = sqlx::query(
            "UPDATE migration_sessions SET \
                status_id = \
                    (SELECT id FROM migration_session_statuses WHERE name = 'upload_complete') \
             WHERE id = $1 AND tenant_id = $2 \
               AND status_id = \
                   (SELECT id FROM migration_session_statuses WHERE name = 'uploading')",
        )
        .bind(session_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        for dataset in datasets {
            // Re-assembly after a partial failure starts clean.
            sqlx::query(
                "DELETE FROM migration_raw_rows WHERE session_id = $1 AND entity_type = $2",
            )
            .bind(session_id)
            .bind(&dataset.entity_type)
            .execute(&mut *tx)
            .await?;

            for (index, row) in dataset.rows.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO migration_raw_rows (session_id, entity_type, row_index, data) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(session_id)
                .bind(&dataset.entity_type)
                .bind(index as i64)
                .bind(row)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                "UPDATE migration_uploads SET source_headers = $3, row_count = $4 \
                 WHERE session_id = $1 AND entity_type = $2",
            )
            .bind(session_id)
            .bind(&dataset.entity_type)
            .bind(&dataset.source_headers)
            .bind(dataset.rows.len() as i64)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM migration_chunks WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Number of raw rows stored for an entity type.
    pub async fn count(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM migration_raw_rows \
             WHERE session_id = $1 AND entity_type = $2",
        )
        .bind(session_id)
        .bind(entity_type)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// One page of raw rows in row order, for batched validation.
    pub async fn list_page(
        pool: &PgPool,
        session_id: DbId,
        entity_type: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MigrationRawRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {RAW_ROW_COLUMNS} FROM migration_raw_rows \
             WHERE session_id = $1 AND entity_type = $2 \
             ORDER BY row_index \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, MigrationRawRow>(&sql)
            .bind(session_id)
            .bind(entity_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
