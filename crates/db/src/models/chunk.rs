//! Chunked-upload models: transient chunks, per-entity-type upload
//! bookkeeping, and the assembled raw rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stevedore_core::types::{DbId, Timestamp};

// ── Upload Chunks ────────────────────────────────────────────────────

/// A row from the `migration_chunks` table. Deleted once the entity
/// type's dataset is assembled into `migration_raw_rows`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationChunk {
    pub id: DbId,
    pub session_id: DbId,
    pub entity_type: String,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for storing one uploaded chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct PutChunk {
    pub session_id: DbId,
    pub entity_type: String,
    pub chunk_index: i32,
    pub total_chunks: i32,
    /// JSON array of row objects.
    pub payload: serde_json::Value,
}

/// Receipt returned after storing a chunk.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChunkReceipt {
    /// Distinct chunk indexes received so far for this entity type.
    pub received: i64,
    /// Authoritative total declared by the first chunk.
    pub total_expected: i32,
}

// ── Upload Bookkeeping ───────────────────────────────────────────────

/// A row from the `migration_uploads` table, one per
/// (session, entity type). Holds the authoritative chunk total and, once
/// assembled, the captured source headers and row count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationUpload {
    pub id: DbId,
    pub session_id: DbId,
    pub entity_type: String,
    pub total_chunks: i32,
    pub source_headers: Vec<String>,
    pub row_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One entity type's fully assembled dataset, ready to persist as raw
/// rows in chunk order.
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    pub entity_type: String,
    /// Column names in left-to-right order, from the first row.
    pub source_headers: Vec<String>,
    /// Row objects in final order (chunk order, then within-chunk order).
    pub rows: Vec<serde_json::Value>,
}

// ── Raw Rows ─────────────────────────────────────────────────────────

/// A row from the `migration_raw_rows` table: one source record,
/// key order preserved from the upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationRawRow {
    pub id: DbId,
    pub session_id: DbId,
    pub entity_type: String,
    pub row_index: i64,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
