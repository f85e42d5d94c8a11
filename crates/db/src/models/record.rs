//! Validation record models and DTOs.
//!
//! One record per raw row per validation run. The `generation` column
//! tags each run so a re-run can replace the prior set atomically;
//! queries always address the latest generation implicitly because prior
//! generations are deleted in the same transaction that writes the new
//! set.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stevedore_core::types::{DbId, Timestamp};

// ── Validation Records ───────────────────────────────────────────────

/// A row from the `migration_validation_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ValidationRecord {
    pub id: DbId,
    pub session_id: DbId,
    pub entity_type: String,
    pub generation: i64,
    pub row_index: i64,
    pub raw_data: serde_json::Value,
    pub mapped_data: serde_json::Value,
    pub fixed_data: Option<serde_json::Value>,
    pub validation_status: String,
    /// Ordered field-level issues as JSON (`FieldIssue` array).
    pub validation_messages: serde_json::Value,
    pub user_action: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting one validation outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateValidationRecord {
    pub session_id: DbId,
    pub entity_type: String,
    pub generation: i64,
    pub row_index: i64,
    pub raw_data: serde_json::Value,
    pub mapped_data: serde_json::Value,
    pub validation_status: String,
    pub validation_messages: serde_json::Value,
}

// ── Preview DTOs ─────────────────────────────────────────────────────

/// Filters for the validation preview.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    /// Filter by validation status name (valid | warning | error).
    pub status: Option<String>,
    /// Filter by entity type.
    pub entity_type: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Per-status record counts for a session (optionally one entity type).
#[derive(Debug, Clone, Copy, Default, FromRow, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub valid: i64,
    pub warning: i64,
    pub error: i64,
}

/// One preview page: the matching records plus overall counts.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewPage {
    pub records: Vec<ValidationRecord>,
    pub counts: StatusCounts,
    pub limit: i64,
    pub offset: i64,
}

/// Result of a bulk action update; bad ids are counted, not fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkActionResult {
    pub updated_count: i64,
    pub skipped_count: i64,
}
