//! In-process per-session exclusive leases.
//!
//! One mutating engine call may be in flight per session; a second
//! concurrent attempt gets [`CoreError::SessionBusy`] instead of
//! blocking. Chunk uploads deliberately bypass the lease (parallel
//! uploads are safe through the upsert-based chunk counter).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use stevedore_core::error::CoreError;
use stevedore_core::types::DbId;

/// Registry of sessions with a mutating operation in flight.
///
/// Shared behind `Arc`; lock hold times are a single set probe.
#[derive(Debug)]
pub struct SessionLocks {
    held: Mutex<HashSet<DbId>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
        }
    }

    /// Take the session's lease. The returned guard releases it on drop.
    pub fn acquire(self: &Arc<Self>, session_id: DbId) -> Result<SessionGuard, CoreError> {
        let mut held = self.held.lock().expect("lease lock poisoned");
        if !held.insert(session_id) {
            return Err(CoreError::SessionBusy { session_id });
        }
        Ok(SessionGuard {
            locks: Arc::clone(self),
            session_id,
        })
    }

    /// Whether a mutating call currently holds the session's lease.
    pub fn is_held(&self, session_id: DbId) -> bool {
        self.held
            .lock()
            .expect("lease lock poisoned")
            .contains(&session_id)
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII lease on one session.
#[derive(Debug)]
pub struct SessionGuard {
    locks: Arc<SessionLocks>,
    session_id: DbId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.locks.held.lock() {
            held.remove(&self.session_id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn second_acquire_fails_busy() {
        let locks = Arc::new(SessionLocks::new());
        let _guard = locks.acquire(7).unwrap();
        assert_matches!(
            locks.acquire(7),
            Err(CoreError::SessionBusy { session_id: 7 })
        );
        // Other sessions are unaffected.
        assert!(locks.acquire(8).is_ok());
    }

    #[test]
    fn dropping_the_guard_releases_the_lease() {
        let locks = Arc::new(SessionLocks::new());
        {
            let _guard = locks.acquire(7).unwrap();
            assert!(locks.is_held(7));
        }
        assert!(!locks.is_held(7));
        assert!(locks.acquire(7).is_ok());
    }
}
