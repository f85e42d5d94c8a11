//! Validation-record vocabulary and commit eligibility (PRD-31).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Validation Status
// ---------------------------------------------------------------------------

/// Outcome class of one validated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Warning,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(Self::Valid),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &["valid", "warning", "error"];
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// User Action
// ---------------------------------------------------------------------------

/// The user's per-record decision, defaulting to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Pending,
    Import,
    Skip,
    Fix,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Import => "import",
            Self::Skip => "skip",
            Self::Fix => "fix",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "import" => Some(Self::Import),
            "skip" => Some(Self::Skip),
            "fix" => Some(Self::Fix),
            _ => None,
        }
    }

    /// All valid action values.
    pub const ALL: &'static [&'static str] = &["pending", "import", "skip", "fix"];
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Whether a record participates in the commit.
///
/// `Import` and `Fix` are explicit opt-ins (`Fix` passed re-validation
/// when it was accepted). Untouched `Pending` rows go in as long as they
/// are not Error-level; `Skip` and still-Error rows stay out and are
/// counted as skipped in the final report.
pub fn is_import_eligible(status: ValidationStatus, action: UserAction) -> bool {
    match action {
        UserAction::Import | UserAction::Fix => true,
        UserAction::Skip => false,
        UserAction::Pending => status != ValidationStatus::Error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for name in ValidationStatus::ALL {
            let s = ValidationStatus::from_str(name).unwrap();
            assert_eq!(s.as_str(), *name);
        }
        assert_eq!(ValidationStatus::from_str("fixed"), None);
    }

    #[test]
    fn action_round_trip() {
        for name in UserAction::ALL {
            let a = UserAction::from_str(name).unwrap();
            assert_eq!(a.as_str(), *name);
        }
        assert_eq!(UserAction::from_str("ignore"), None);
    }

    #[test]
    fn pending_rows_eligible_unless_error() {
        assert!(is_import_eligible(ValidationStatus::Valid, UserAction::Pending));
        assert!(is_import_eligible(ValidationStatus::Warning, UserAction::Pending));
        assert!(!is_import_eligible(ValidationStatus::Error, UserAction::Pending));
    }

    #[test]
    fn skip_always_excluded() {
        for status in [
            ValidationStatus::Valid,
            ValidationStatus::Warning,
            ValidationStatus::Error,
        ] {
            assert!(!is_import_eligible(status, UserAction::Skip));
        }
    }

    #[test]
    fn explicit_import_and_accepted_fix_always_eligible() {
        assert!(is_import_eligible(ValidationStatus::Valid, UserAction::Import));
        assert!(is_import_eligible(ValidationStatus::Warning, UserAction::Fix));
    }
}
