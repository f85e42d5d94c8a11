//! Row validation (PRD-31): per-field checks and classification.
//!
//! Checks run against the mapped row, driven entirely by the target
//! schema. The output is data, not errors: an ordered list of
//! [`FieldIssue`]s that is persisted with the record and surfaced
//! verbatim by preview and by fix rejections.

pub mod checks;

pub use checks::check_row;

use serde::{Deserialize, Serialize};

use crate::record::ValidationStatus;

/// Rows are validated and written in slices of this size.
pub const VALIDATION_BATCH_SIZE: usize = 500;

/// Severity of a single field-level finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One field-level finding on one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,

    /// Machine-readable code, e.g. `required`, `invalid_decimal`,
    /// `probable_duplicate`.
    pub code: String,

    pub severity: IssueSeverity,
    pub message: String,
}

impl FieldIssue {
    pub fn error(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }
}

/// Classify a row from its findings: any Error-level issue makes the row
/// Error, otherwise any issue at all makes it Warning.
pub fn classify(issues: &[FieldIssue]) -> ValidationStatus {
    if issues.iter().any(|i| i.severity == IssueSeverity::Error) {
        ValidationStatus::Error
    } else if issues.is_empty() {
        ValidationStatus::Valid
    } else {
        ValidationStatus::Warning
    }
}
