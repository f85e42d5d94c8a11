use stevedore_core::error::CoreError;
use stevedore_core::types::DbId;

/// Service-level error type for engine operations.
///
/// Wraps [`CoreError`] for domain errors and adds the database layer.
/// Per-record import failures are never represented here; they live in
/// the validation-record and import-progress data.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error from `stevedore_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for engine method return values.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Shorthand for the not-found case at repository boundaries.
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}
