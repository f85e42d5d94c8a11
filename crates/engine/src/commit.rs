//! Background commit jobs and progress reporting.
//!
//! `start_commit` flips the session to `committing`, registers a job,
//! and spawns the worker; the caller gets the job id back immediately
//! and polls `get_progress`. The worker walks entity types in name
//! order and eligible records in ascending id order, persisting progress
//! after every attempted record so a crashed or restarted job resumes
//! within one record of where it stopped.

use std::time::Duration;

use serde::Deserialize;
use stevedore_core::commit::{progress_outcome, session_outcome, FAILURE_REASON_TIMEOUT};
use stevedore_core::error::CoreError;
use stevedore_core::types::{DbId, TenantId};
use stevedore_core::SessionStatus;
use stevedore_db::models::progress::ProgressReport;
use stevedore_db::models::session::ImportCounts;
use stevedore_db::repositories::progress_repo::ProgressRepo;
use stevedore_db::repositories::record_repo::RecordRepo;
use stevedore_db::repositories::session_repo::SessionRepo;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collab::WriteOutcome;
use crate::error::EngineError;
use crate::sessions::parse_status;
use crate::{EngineResult, MigrationEngine};

/// Caller-tunable knobs for one commit run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitOptions {
    /// Records per batch; defaults to the engine config value.
    pub batch_size: Option<i64>,
}

impl MigrationEngine {
    /// Start (or resume) the background import of all eligible records.
    ///
    /// Returns the job id. A session already in `committing` with no
    /// live job is the crash-recovery case: the new job resumes from the
    /// durable per-entity-type offsets.
    pub async fn start_commit(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        options: &CommitOptions,
    ) -> EngineResult<Uuid> {
        let _lease = self.locks.acquire(session_id)?;
        let session = self.get_session(tenant_id, session_id).await?;
        let current = parse_status(&session)?;
        current.require_one_of(
            &[SessionStatus::ReadyToCommit, SessionStatus::Committing],
            "ready_to_commit",
        )?;
        if self.jobs.get(session_id).await.is_some() {
            return Err(CoreError::SessionBusy { session_id }.into());
        }
        if current == SessionStatus::ReadyToCommit {
            self.transition_required(
                tenant_id,
                session_id,
                SessionStatus::ReadyToCommit,
                SessionStatus::Committing,
                "ready_to_commit",
            )
            .await?;
        }

        let job = self
            .jobs
            .register(session_id)
            .await
            .ok_or(CoreError::SessionBusy { session_id })?;
        let batch_size = options.batch_size.unwrap_or(self.config.commit_batch_size).max(1);
        let mut entity_types = session.entities.clone();
        entity_types.sort();

        let engine = self.clone();
        let cancel = job.cancel.clone();
        let job_id = job.job_id;
        tokio::spawn(async move {
            let run = engine
                .run_commit_job(tenant_id, session_id, &entity_types, batch_size, &cancel)
                .await;
            if let Err(e) = run {
                tracing::error!(session_id, job_id = %job_id, error = %e, "Commit job failed");
                engine.abort_commit_job(tenant_id, session_id, &e.to_string()).await;
            }
            engine.jobs.deregister(session_id).await;
        });

        tracing::info!(session_id, job_id = %job.job_id, batch_size, "Commit job started");
        Ok(job.job_id)
    }

    /// The commit worker. Runs on its own task; every return path leaves
    /// the session in a defined state.
    async fn run_commit_job(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
        entity_types: &[String],
        batch_size: i64,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let mut cancelled = false;
        'entities: for entity_type in entity_types {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let eligible = RecordRepo::count_eligible(&self.pool, session_id, entity_type).await?;
            let progress = ProgressRepo::open(&self.pool, session_id, entity_type, eligible).await?;
            let mut after_id = progress.last_processed_offset;

            loop {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'entities;
                }
                let batch = RecordRepo::list_eligible_page(
                    &self.pool,
                    session_id,
                    entity_type,
                    after_id,
                    batch_size,
                )
                .await?;
                let Some(last_id) = batch.last().map(|r| r.id) else {
                    break;
                };

                let write_batch = async {
                    for record in &batch {
                        let payload = record.fixed_data.as_ref().unwrap_or(&record.mapped_data);
                        let succeeded =
                            match self.writer.write(tenant_id, entity_type, payload).await {
                                WriteOutcome::Success => true,
                                WriteOutcome::Failure(reason) => {
                                    tracing::warn!(
                                        session_id,
                                        record_id = record.id,
                                        reason = %reason,
                                        "Record import failed"
                                    );
                                    false
                                }
                            };
                        ProgressRepo::record_attempt(
                            &self.pool,
                            session_id,
                            entity_type,
                            record.id,
                            succeeded,
                        )
                        .await?;
                    }
                    Ok::<(), EngineError>(())
                };
                let deadline = Duration::from_secs(self.config.commit_batch_timeout_secs);
                match tokio::time::timeout(deadline, write_batch).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Batch hit its deadline. The progress row is the
                        // durable truth of what was attempted; everything
                        // past its offset in this batch counts as failed.
                        let durable = ProgressRepo::find(&self.pool, session_id, entity_type)
                            .await?
                            .ok_or_else(|| {
                                EngineError::not_found("ImportProgress", session_id)
                            })?;
                        for record in
                            batch.iter().filter(|r| r.id > durable.last_processed_offset)
                        {
                            tracing::warn!(
                                session_id,
                                record_id = record.id,
                                reason = FAILURE_REASON_TIMEOUT,
                                "Record import failed"
                            );
                            ProgressRepo::record_attempt(
                                &self.pool,
                                session_id,
                                entity_type,
                                record.id,
                                false,
                            )
                            .await?;
                        }
                    }
                }
                after_id = last_id;
            }

            let finished = ProgressRepo::find(&self.pool, session_id, entity_type)
                .await?
                .ok_or_else(|| EngineError::not_found("ImportProgress", session_id))?;
            let outcome = progress_outcome(finished.succeeded_records, finished.failed_records);
            ProgressRepo::set_status(&self.pool, session_id, entity_type, outcome.as_str()).await?;
            tracing::info!(
                session_id,
                entity_type,
                succeeded = finished.succeeded_records,
                failed = finished.failed_records,
                outcome = %outcome,
                "Entity type committed"
            );
        }

        if cancelled {
            // Progress rows and aggregates stay as they are; only the
            // session flips, so the partial import remains inspectable.
            tracing::info!(session_id, "Commit job cancelled");
            self.transition_required(
                tenant_id,
                session_id,
                SessionStatus::Committing,
                SessionStatus::Cancelled,
                "committing",
            )
            .await?;
            return Ok(());
        }

        let rows = ProgressRepo::list_by_session(&self.pool, session_id).await?;
        let succeeded: i64 = rows.iter().map(|p| p.succeeded_records).sum();
        let failed: i64 = rows.iter().map(|p| p.failed_records).sum();
        let skipped = RecordRepo::count_skipped(&self.pool, session_id).await?;
        let outcome = session_outcome(succeeded, failed);
        let error_message = (outcome == SessionStatus::Failed)
            .then(|| format!("{failed} record(s) failed to import"));
        SessionRepo::update_import_counts(
            &self.pool,
            session_id,
            ImportCounts {
                imported: succeeded,
                failed,
                skipped,
            },
            error_message.as_deref(),
        )
        .await?
        .ok_or_else(|| EngineError::not_found("MigrationSession", session_id))?;
        self.transition_required(
            tenant_id,
            session_id,
            SessionStatus::Committing,
            outcome,
            "committing",
        )
        .await?;
        tracing::info!(
            session_id,
            imported = succeeded,
            failed,
            skipped,
            outcome = %outcome,
            "Commit job finished"
        );
        Ok(())
    }

    /// Best-effort bookkeeping for a job that died on an infrastructure
    /// error. The transition guard may legitimately lose (for example to
    /// a concurrent cancel); that is logged and dropped.
    async fn abort_commit_job(&self, tenant_id: TenantId, session_id: DbId, message: &str) {
        let result: EngineResult<()> = async {
            let rows = ProgressRepo::list_by_session(&self.pool, session_id).await?;
            let succeeded: i64 = rows.iter().map(|p| p.succeeded_records).sum();
            let failed: i64 = rows.iter().map(|p| p.failed_records).sum();
            let skipped = RecordRepo::count_skipped(&self.pool, session_id).await?;
            SessionRepo::update_import_counts(
                &self.pool,
                session_id,
                ImportCounts {
                    imported: succeeded,
                    failed,
                    skipped,
                },
                Some(message),
            )
            .await?;
            let _ = SessionRepo::transition(
                &self.pool,
                tenant_id,
                session_id,
                SessionStatus::Committing.as_str(),
                SessionStatus::Failed.as_str(),
            )
            .await?;
            Ok(())
        }
        .await;
        if let Err(e) = result {
            tracing::error!(session_id, error = %e, "Could not record commit failure");
        }
    }

    /// Current progress for every entity type plus the live job id, if a
    /// job is running right now.
    pub async fn get_progress(
        &self,
        tenant_id: TenantId,
        session_id: DbId,
    ) -> EngineResult<ProgressReport> {
        let session = self.get_session(tenant_id, session_id).await?;
        let entity_types = ProgressRepo::list_by_session(&self.pool, session_id).await?;
        let job_id = self.jobs.get(session_id).await.map(|job| job.job_id);
        Ok(ProgressReport {
            session_id,
            session_status: session.status,
            job_id,
            entity_types,
        })
    }
}
