//! In-process registry of live commit jobs.
//!
//! Maps session id to the running job's id and cancellation token. The
//! registry is the authority on whether a commit is live: `start_commit`
//! refuses a session with a registered job, and crash recovery is
//! exactly the case of a `committing` session with no entry here.

use std::collections::HashMap;

use stevedore_core::types::DbId;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Handle to one running commit job.
#[derive(Debug, Clone)]
pub struct CommitJob {
    pub job_id: Uuid,
    pub cancel: CancellationToken,
}

/// Tracks the commit job per session.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the engine and its spawned jobs.
pub struct CommitJobs {
    jobs: RwLock<HashMap<DbId, CommitJob>>,
}

impl CommitJobs {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a job for the session. Returns `None` when a job is
    /// already live, leaving the existing entry untouched.
    pub async fn register(&self, session_id: DbId) -> Option<CommitJob> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&session_id) {
            return None;
        }
        let job = CommitJob {
            job_id: Uuid::now_v7(),
            cancel: CancellationToken::new(),
        };
        jobs.insert(session_id, job.clone());
        Some(job)
    }

    /// The live job for a session, if any.
    pub async fn get(&self, session_id: DbId) -> Option<CommitJob> {
        self.jobs.read().await.get(&session_id).cloned()
    }

    /// Trigger the session's job token. Returns whether a job was live.
    pub async fn cancel(&self, session_id: DbId) -> bool {
        match self.jobs.read().await.get(&session_id) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the session's entry once its job has finished.
    pub async fn deregister(&self, session_id: DbId) {
        self.jobs.write().await.remove(&session_id);
    }

    /// Number of live jobs.
    pub async fn live_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl Default for CommitJobs {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_is_exclusive_per_session() {
        let jobs = CommitJobs::new();
        let first = jobs.register(1).await.unwrap();
        assert!(jobs.register(1).await.is_none());
        assert!(jobs.register(2).await.is_some());
        assert_eq!(jobs.live_count().await, 2);

        jobs.deregister(1).await;
        let second = jobs.register(1).await.unwrap();
        assert_ne!(first.job_id, second.job_id);
    }

    #[tokio::test]
    async fn cancel_triggers_the_live_token() {
        let jobs = CommitJobs::new();
        let job = jobs.register(1).await.unwrap();
        assert!(!job.cancel.is_cancelled());

        assert!(jobs.cancel(1).await);
        assert!(job.cancel.is_cancelled());
        assert!(!jobs.cancel(99).await);
    }
}
