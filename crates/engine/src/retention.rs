//! Background sweep purging expired terminal sessions.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use stevedore_db::repositories::session_repo::SessionRepo;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::EngineConfig;

/// Run the retention sweep until cancelled. Spawn this once at startup
/// next to the engine; active sessions are never touched because only
/// terminal ones are purgeable.
pub async fn run_retention_sweep(pool: PgPool, config: EngineConfig, cancel: CancellationToken) {
    info!(
        retention_hours = config.session_retention_hours,
        interval_secs = config.retention_sweep_interval_secs,
        "Starting session retention sweep"
    );
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.retention_sweep_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Session retention sweep stopped");
                break;
            }
            _ = interval.tick() => {
                match SessionRepo::purge_expired(&pool, Utc::now()).await {
                    Ok(0) => debug!("No expired sessions to purge"),
                    Ok(purged) => info!(purged, "Purged expired sessions"),
                    Err(e) => error!(error = %e, "Session retention sweep failed"),
                }
            }
        }
    }
}
