use stevedore_core::commit::DEFAULT_COMMIT_BATCH_SIZE;

/// Default session retention: 72 hours after creation.
const DEFAULT_RETENTION_HOURS: i64 = 72;

/// Default per-batch timeout for commit writes.
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 30;

/// How often the retention sweep runs.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Engine configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hours after creation at which a terminal session becomes
    /// purgeable (default: `72`).
    pub session_retention_hours: i64,
    /// Records per commit batch (default: `100`).
    pub commit_batch_size: i64,
    /// Per-batch timeout in seconds for commit writes (default: `30`).
    /// Records left unattempted when a batch times out are marked failed
    /// with a timeout reason.
    pub commit_batch_timeout_secs: u64,
    /// Seconds between retention sweep runs (default: `3600`).
    pub retention_sweep_interval_secs: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `SESSION_RETENTION_HOURS`   | `72`    |
    /// | `COMMIT_BATCH_SIZE`         | `100`   |
    /// | `COMMIT_BATCH_TIMEOUT_SECS` | `30`    |
    /// | `RETENTION_SWEEP_INTERVAL_SECS` | `3600` |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let session_retention_hours: i64 = std::env::var("SESSION_RETENTION_HOURS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_HOURS.to_string())
            .parse()
            .expect("SESSION_RETENTION_HOURS must be a valid i64");

        let commit_batch_size: i64 = std::env::var("COMMIT_BATCH_SIZE")
            .unwrap_or_else(|_| DEFAULT_COMMIT_BATCH_SIZE.to_string())
            .parse()
            .expect("COMMIT_BATCH_SIZE must be a valid i64");

        let commit_batch_timeout_secs: u64 = std::env::var("COMMIT_BATCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_BATCH_TIMEOUT_SECS.to_string())
            .parse()
            .expect("COMMIT_BATCH_TIMEOUT_SECS must be a valid u64");

        let retention_sweep_interval_secs: u64 = std::env::var("RETENTION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("RETENTION_SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            session_retention_hours,
            commit_batch_size,
            commit_batch_timeout_secs,
            retention_sweep_interval_secs,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_retention_hours: DEFAULT_RETENTION_HOURS,
            commit_batch_size: DEFAULT_COMMIT_BATCH_SIZE,
            commit_batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
            retention_sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}
