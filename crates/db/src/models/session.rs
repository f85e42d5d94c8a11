//! Migration session models and DTOs.
//!
//! The session row carries the state-machine status (resolved to its name
//! via the `migration_session_statuses` lookup), the confirmed mapping
//! config, and the aggregate counters written at validation and commit
//! time.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stevedore_core::types::{DbId, TenantId, Timestamp};
use validator::Validate;

// ── Session Status ───────────────────────────────────────────────────

/// A row from the `migration_session_statuses` lookup table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationSessionStatus {
    pub id: i16,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── Sessions ─────────────────────────────────────────────────────────

/// A row from the `migration_sessions` table. `status` is the lookup
/// name joined in by every query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationSession {
    pub id: DbId,
    pub tenant_id: TenantId,
    pub user_id: DbId,
    pub source_type: String,
    pub source_name: String,
    /// Entity types declared at creation; immutable afterwards.
    pub entities: Vec<String>,
    pub status: String,
    /// Confirmed field mappings keyed by entity type.
    pub mapping_config: serde_json::Value,
    pub total_records: i64,
    pub valid_records: i64,
    pub warning_records: i64,
    pub error_records: i64,
    pub imported_records: i64,
    pub failed_records: i64,
    pub skipped_records: i64,
    pub error_message: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new migration session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMigrationSession {
    pub source_type: String,
    #[validate(length(min = 1, max = 200))]
    pub source_name: String,
    /// Entity types to import in this session.
    #[validate(length(min = 1))]
    pub entities: Vec<String>,
}

/// Aggregate counters written when a validation run finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationCounts {
    pub total: i64,
    pub valid: i64,
    pub warning: i64,
    pub error: i64,
}

/// Aggregate counters written when a commit job finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportCounts {
    pub imported: i64,
    pub failed: i64,
    pub skipped: i64,
}

/// Query parameters for listing a tenant's sessions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionListQuery {
    /// Filter by status name (e.g. "ready_to_commit").
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
