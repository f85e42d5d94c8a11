//! Migration session state machine (PRD-31).
//!
//! A session walks the pipeline `Created → Uploading → UploadComplete →
//! Mapped → Validating → ReadyToCommit → Committing` and ends in one of
//! `Completed`, `Failed`, `PartiallyFailed`, or `Cancelled`. The legal
//! edges live in one exhaustive table ([`SessionStatus::can_transition`]);
//! every layer above goes through it, so an illegal move is rejected here
//! rather than by scattered ad hoc checks.
//!
//! Two recovery edges exist alongside the forward path: `ReadyToCommit →
//! Mapped` when a mapping is replaced after validation (the entity type's
//! validation records are invalidated and must be regenerated) and
//! `ReadyToCommit → Validating` when validation is re-run in full.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Session Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a migration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Uploading,
    UploadComplete,
    Mapped,
    Validating,
    ReadyToCommit,
    Committing,
    Completed,
    Failed,
    PartiallyFailed,
    Cancelled,
}

impl SessionStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::UploadComplete => "upload_complete",
            Self::Mapped => "mapped",
            Self::Validating => "validating",
            Self::ReadyToCommit => "ready_to_commit",
            Self::Committing => "committing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "uploading" => Some(Self::Uploading),
            "upload_complete" => Some(Self::UploadComplete),
            "mapped" => Some(Self::Mapped),
            "validating" => Some(Self::Validating),
            "ready_to_commit" => Some(Self::ReadyToCommit),
            "committing" => Some(Self::Committing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "partially_failed" => Some(Self::PartiallyFailed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &[
        "created",
        "uploading",
        "upload_complete",
        "mapped",
        "validating",
        "ready_to_commit",
        "committing",
        "completed",
        "failed",
        "partially_failed",
        "cancelled",
    ];

    /// Terminal states admit no further transitions and are the only
    /// states in which a session may be deleted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::PartiallyFailed | Self::Cancelled
        )
    }

    /// Names of the terminal states, as stored in the database.
    pub const TERMINAL: &'static [&'static str] =
        &["completed", "failed", "partially_failed", "cancelled"];

    /// The exhaustive transition table.
    ///
    /// `Cancelled` is reachable from every non-terminal state and is
    /// irreversible. Everything else follows the pipeline plus the two
    /// recovery edges out of `ReadyToCommit`.
    pub fn can_transition(self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, to) {
            (Created, Uploading) => true,
            (Uploading, UploadComplete) => true,
            (UploadComplete, Mapped) => true,
            (Mapped, Validating) => true,
            (Validating, ReadyToCommit) => true,
            (ReadyToCommit, Committing) => true,
            // Recovery edges: re-map or re-validate after a full validation.
            (ReadyToCommit, Mapped) => true,
            (ReadyToCommit, Validating) => true,
            (Committing, Completed) => true,
            (Committing, Failed) => true,
            (Committing, PartiallyFailed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Guard helper: fail with [`CoreError::InvalidSessionState`] unless
    /// the current status is one of `allowed`. `required` is the
    /// human-readable name of the state(s) the operation needs.
    pub fn require_one_of(
        self,
        allowed: &[SessionStatus],
        required: &'static str,
    ) -> Result<(), CoreError> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(CoreError::InvalidSessionState {
                current: self,
                required,
            })
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Source Type
// ---------------------------------------------------------------------------

/// Where the raw data came from. Free text detail lives in the session's
/// `source_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    LegacyErp,
    CrmExport,
    Spreadsheet,
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyErp => "legacy_erp",
            Self::CrmExport => "crm_export",
            Self::Spreadsheet => "spreadsheet",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "legacy_erp" => Some(Self::LegacyErp),
            "crm_export" => Some(Self::CrmExport),
            "spreadsheet" => Some(Self::Spreadsheet),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// All valid source type values.
    pub const ALL: &'static [&'static str] = &["legacy_erp", "crm_export", "spreadsheet", "other"];
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
