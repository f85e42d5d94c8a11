//! Import batch constants and commit outcome classification (PRD-31).

use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Records written per batch unless configured otherwise.
pub const DEFAULT_COMMIT_BATCH_SIZE: i64 = 100;

/// Reason recorded when a whole batch hits its deadline.
pub const FAILURE_REASON_TIMEOUT: &str = "timeout";

// ---------------------------------------------------------------------------
// Progress Status
// ---------------------------------------------------------------------------

/// Per-entity-type import progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
    PartiallyFailed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "partially_failed" => Some(Self::PartiallyFailed),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &[
        "not_started",
        "running",
        "completed",
        "failed",
        "partially_failed",
    ];
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome classification
// ---------------------------------------------------------------------------

/// Terminal session state once every eligible record was attempted.
/// Nothing eligible counts as a clean completion.
pub fn session_outcome(succeeded: i64, failed: i64) -> SessionStatus {
    if failed == 0 {
        SessionStatus::Completed
    } else if succeeded > 0 {
        SessionStatus::PartiallyFailed
    } else {
        SessionStatus::Failed
    }
}

/// Same ladder for a single entity type's progress row.
pub fn progress_outcome(succeeded: i64, failed: i64) -> ProgressStatus {
    if failed == 0 {
        ProgressStatus::Completed
    } else if succeeded > 0 {
        ProgressStatus::PartiallyFailed
    } else {
        ProgressStatus::Failed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
