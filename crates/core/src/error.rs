//! Error taxonomy for the migration pipeline.
//!
//! Structural and state errors are returned to callers synchronously with
//! enough detail to retry the correct step. Per-record validation and
//! import failures are never modeled here; they accumulate in the
//! validation-record and import-progress data instead.

use crate::session::SessionStatus;
use crate::types::DbId;
use crate::validation::FieldIssue;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The operation requires a session state other than the current one.
    /// Recoverable: the caller retries the correct pipeline step.
    #[error("Session is in state '{current}' but '{required}' is required")]
    InvalidSessionState {
        current: SessionStatus,
        required: &'static str,
    },

    /// Another mutating call holds the session's exclusive lease.
    /// Recoverable: retry after backoff.
    #[error("Session {session_id} has another operation in flight")]
    SessionBusy { session_id: DbId },

    /// One or more entity types are missing chunks.
    #[error("Upload incomplete for entity types: {}", .entity_types.join(", "))]
    IncompleteUpload { entity_types: Vec<String> },

    /// A chunk declared a total that contradicts the first chunk received
    /// for its entity type.
    #[error(
        "Chunk total mismatch for '{entity_type}': {declared} declared, chunk reported {reported}"
    )]
    ChunkTotalMismatch {
        entity_type: String,
        declared: i32,
        reported: i32,
    },

    /// A fix payload still fails required-field or type checks. Carries
    /// the same field-level issues the preview would show.
    #[error("Fixed data still fails validation ({} issue(s))", .issues.len())]
    StillInvalid { issues: Vec<FieldIssue> },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),
}
