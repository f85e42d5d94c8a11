//! Session orchestration for the tenant bulk-data migration pipeline
//! (PRD-31).
//!
//! [`MigrationEngine`] is the single entry point callers hold. It owns
//! the connection pool, the engine configuration, and the collaborator
//! trait objects, and exposes one async method per pipeline operation.
//! The engine is cheap to clone; spawned commit jobs carry their own
//! clone.
//!
//! Operation modules extend `MigrationEngine` with `impl` blocks:
//!
//! - [`sessions`] — session lifecycle (create, list, cancel, delete).
//! - [`upload`] — chunked upload intake and dataset assembly.
//! - [`mapping`] — mapping suggestions and configuration.
//! - [`validation`] — validation runs and record preview.
//! - [`records`] — per-record and bulk user decisions.
//! - [`commit`] — background import jobs and progress reporting.
//! - [`retention`] — the expired-session sweep loop.

use std::sync::Arc;

use sqlx::PgPool;

pub mod catalog;
pub mod collab;
pub mod commit;
pub mod config;
pub mod error;
pub mod jobs;
pub mod lease;
pub mod mapping;
pub mod records;
pub mod retention;
pub mod sessions;
pub mod upload;
pub mod validation;

pub use catalog::StaticSchemaCatalog;
pub use collab::{EntityWriter, ExistenceReader, SchemaCatalog, WriteOutcome};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};

use jobs::CommitJobs;
use lease::SessionLocks;

/// The migration session engine.
///
/// All operations are tenant-scoped: a `tenant_id` is the first argument
/// everywhere and rows belonging to other tenants are invisible.
#[derive(Clone)]
pub struct MigrationEngine {
    pool: PgPool,
    config: Arc<EngineConfig>,
    writer: Arc<dyn EntityWriter>,
    reader: Arc<dyn ExistenceReader>,
    catalog: Arc<dyn SchemaCatalog>,
    locks: Arc<SessionLocks>,
    jobs: Arc<CommitJobs>,
}

impl MigrationEngine {
    pub fn new(
        pool: PgPool,
        config: EngineConfig,
        writer: Arc<dyn EntityWriter>,
        reader: Arc<dyn ExistenceReader>,
        catalog: Arc<dyn SchemaCatalog>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            writer,
            reader,
            catalog,
            locks: Arc::new(SessionLocks::new()),
            jobs: Arc::new(CommitJobs::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
