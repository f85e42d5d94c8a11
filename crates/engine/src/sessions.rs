//! Session lifecycle: create, fetch, list, cancel, delete, purge.

use chrono::{Duration, Utc};
use stevedore_core::error::CoreError;
use stevedore_core::types::{DbId, TenantId, Timestamp};
use stevedore_core::{SessionStatus, SourceType};
use stevedore_db::models::session::{CreateMigrationSession, MigrationSession, SessionListQuery};
use stevedore_db::repositories::session_repo::SessionRepo;
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::MigrationEngine;

/// Resolve the stored status name to the state-machine enum. The name
/// always comes from the lookup table, so a miss means schema drift.
pub(crate) fn parse_status(session: &MigrationSession) -> Result<SessionStatus, CoreError> {
    SessionStatus::from_str(&session.status).ok_or_else(|| {
        CoreError::Validation(format!("unrecognized session status '{}'", session.status))
    })
}

impl MigrationEngine {
    /// Guarded transition that must succeed. When the guard fails the
    /// session is re-read so the error names the actual current state.
    pub(crate) async fn transition_required(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        from: SessionStatus,
        to: SessionStatus,
        required: &'static str,
    ) -> EngineResult<MigrationSession> {
        let moved =
            SessionRepo::transition(&self.pool, tenant_id, session_id, from.as_str(), to.as_str())
                .await?;
        match moved {
            Some(session) => {
                tracing::info!(session_id, from = %from, to = %to, "Session transitioned");
                Ok(session)
            }
            None => {
                let session = SessionRepo::find_by_id(&self.pool, tenant_id, session_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("MigrationSession", session_id))?;
                let current = parse_status(&session)?;
                Err(CoreError::InvalidSessionState { current, required }.into())
            }
        }
    }

    /// Create a migration session in `created` status.
    ///
    /// Validates the source type and checks every declared entity type
    /// against the schema catalogue before touching the database.
    pub async fn create_session(
        &self,
        tenant_id: TenantId,
        user_id: DbId,
        input: &CreateMigrationSession,
    ) -> EngineResult<MigrationSession> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if SourceType::from_str(&input.source_type).is_none() {
            return Err(CoreError::Validation(format!(
                "unknown source type '{}', expected one of: {}",
                input.source_type,
                SourceType::ALL.join(", ")
            ))
            .into());
        }
        for entity_type in &input.entities {
            if self.catalog.schema_for(entity_type).await.is_none() {
                return Err(
                    CoreError::Validation(format!("unknown entity type '{entity_type}'")).into(),
                );
            }
        }

        let expires_at = Utc::now() + Duration::hours(self.config.session_retention_hours);
        let session = SessionRepo::create(&self.pool, tenant_id, user_id, input, expires_at).await?;
        tracing::info!(
            session_id = session.id,
            tenant_id,
            entities = ?session.entities,
            "Migration session created"
        );
        Ok(session)
    }

    /// Fetch one session, scoped to its tenant.
    pub async fn get_session(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<MigrationSession> {
        SessionRepo::find_by_id(&self.pool, tenant_id, session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("MigrationSession", session_id))
    }

    /// List the tenant's sessions, newest first.
    pub async fn list_sessions(
        &self,
        tenant_id: TenantId,
        query: &SessionListQuery,
    ) -> EngineResult<Vec<MigrationSession>> {
        if let Some(status) = &query.status {
            if SessionStatus::from_str(status).is_none() {
                return Err(
                    CoreError::Validation(format!("unknown status filter '{status}'")).into(),
                );
            }
        }
        Ok(SessionRepo::list(&self.pool, tenant_id, query).await?)
    }

    /// Cancel a session from any non-terminal state.
    ///
    /// When a commit job is live its token is triggered instead of
    /// flipping the status here; the job observes the token between
    /// batches and performs the `committing → cancelled` transition
    /// itself.
    pub async fn cancel_session(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<MigrationSession> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        let current = parse_status(&session)?;
        if current.is_terminal() {
            return Err(CoreError::InvalidSessionState {
                current,
                required: "any non-terminal state",
            }
            .into());
        }

        if self.jobs.cancel(session_id).await {
            tracing::info!(session_id, "Commit job signalled to cancel");
            return Ok(session);
        }

        self.transition_required(
            tenant_id,
            session_id,
            current,
            SessionStatus::Cancelled,
            "any non-terminal state",
        )
        .await
    }

    /// Delete a terminal session and everything hanging off it.
    pub async fn delete_session(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<()> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        let current = parse_status(&session)?;
        if !current.is_terminal() {
            return Err(CoreError::InvalidSessionState {
                current,
                required: "a terminal state",
            }
            .into());
        }

        if !SessionRepo::delete(&self.pool, tenant_id, session_id).await? {
            return Err(EngineError::not_found("MigrationSession", session_id));
        }
        tracing::info!(session_id, tenant_id, "Migration session deleted");
        Ok(())
    }

    /// Purge terminal sessions whose retention window has passed.
    /// Returns the number of sessions removed.
    pub async fn purge_expired(&self, now: Timestamp) -> EngineResult<u64> {
        Ok(SessionRepo::purge_expired(&self.pool, now).await?)
    }
}
