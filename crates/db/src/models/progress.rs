//! Import progress models, one row per (session, entity type).

use serde::Serialize;
use sqlx::FromRow;
use stevedore_core::types::{DbId, Timestamp};

// ── Import Progress ──────────────────────────────────────────────────

/// A row from the `migration_import_progress` table. Created when a
/// commit job starts, updated after every record, never deleted while
/// the session exists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportProgress {
    pub id: DbId,
    pub session_id: DbId,
    pub entity_type: String,
    pub total_records: i64,
    pub processed_records: i64,
    pub succeeded_records: i64,
    pub failed_records: i64,
    /// Highest validation-record id attempted so far; a resumed commit
    /// picks up strictly after this.
    pub last_processed_offset: i64,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Progress report for a whole session, one entry per entity type plus
/// the commit job id when a job is live.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub session_id: DbId,
    pub session_status: String,
    pub job_id: Option<uuid::Uuid>,
    pub entity_types: Vec<ImportProgress>,
}
