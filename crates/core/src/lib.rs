//! Stevedore domain logic.
//!
//! Pure building blocks for the tenant bulk-data migration pipeline
//! (PRD-31). Everything in this crate is synchronous and free of I/O so
//! the persistence and orchestration layers can exercise it directly and
//! tests stay deterministic:
//!
//! - [`session`] — the migration session state machine and source types.
//! - [`chunk`] — chunked-upload arithmetic and payload parsing.
//! - [`schema`] — the target-schema shape consumed by mapping and
//!   validation.
//! - [`mapping`] — field-mapping suggestion scoring and mapping
//!   application.
//! - [`validation`] — per-field checks and row classification.
//! - [`record`] — validation record vocabulary and commit eligibility.
//! - [`commit`] — import batch constants and outcome classification.

pub mod chunk;
pub mod commit;
pub mod error;
pub mod mapping;
pub mod paging;
pub mod record;
pub mod schema;
pub mod session;
pub mod types;
pub mod validation;

pub use error::CoreError;
pub use session::{SessionStatus, SourceType};
