//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Update DTOs where partial patches apply

pub mod chunk;
pub mod progress;
pub mod record;
pub mod session;
