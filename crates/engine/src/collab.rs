//! Collaborator seams for the surrounding platform (PRD-31).
//!
//! The engine never writes business entities or inspects existing tenant
//! data directly. Concrete domain writers, uniqueness readers, and the
//! schema catalogue are injected at construction as trait objects, which
//! keeps the commit orchestrator domain-agnostic and makes the engine
//! testable with scripted collaborators.

use async_trait::async_trait;
use stevedore_core::schema::TargetSchema;
use stevedore_core::types::TenantId;

/// Outcome of writing one record through an [`EntityWriter`].
///
/// Failures are per-record data, not errors: the commit job records the
/// reason and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Success,
    Failure(String),
}

/// Writes one imported record into the platform's data store.
#[async_trait]
pub trait EntityWriter: Send + Sync {
    /// Persist `record` (the mapped or fixed payload) as a new entity of
    /// `entity_type` for the tenant.
    async fn write(
        &self,
        tenant_id: TenantId,
        entity_type: &str,
        record: &serde_json::Value,
    ) -> WriteOutcome;
}

/// Read-only uniqueness probe against existing tenant data, used by the
/// probable-duplicate check during validation.
#[async_trait]
pub trait ExistenceReader: Send + Sync {
    /// Whether an entity of `entity_type` with the given unique-key value
    /// already exists for the tenant.
    async fn exists(&self, tenant_id: TenantId, entity_type: &str, key: &str) -> bool;
}

/// Target-schema lookup by entity type.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// The schema for `entity_type`, or `None` if the catalogue does not
    /// know the type.
    async fn schema_for(&self, entity_type: &str) -> Option<TargetSchema>;
}
