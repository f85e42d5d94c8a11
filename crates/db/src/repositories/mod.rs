//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod chunk_repo;
pub mod progress_repo;
pub mod record_repo;
pub mod session_repo;

pub use chunk_repo::{ChunkRepo, RawRowRepo, UploadRepo};
pub use progress_repo::ProgressRepo;
pub use record_repo::RecordRepo;
pub use session_repo::SessionRepo;
