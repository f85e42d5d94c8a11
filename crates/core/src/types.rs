/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Tenant identifiers come from the platform's tenancy service and are
/// carried through every operation for row-level scoping.
pub type TenantId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
