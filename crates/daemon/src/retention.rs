//! Periodic cleanup of old readings.
//!
//! Alert ledger rows and telemetry are kept; only raw readings expire.

use std::sync::Arc;
use std::time::Duration;

use noisewatch_core::clock::Clock;
use noisewatch_db::repositories::ReadingRepo;
use noisewatch_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Delete readings captured more than `retention` before the clock's now.
pub async fn purge_once(
    pool: &DbPool,
    clock: &dyn Clock,
    retention: Duration,
) -> Result<u64, sqlx::Error> {
    let retention_secs = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
    let cutoff = clock.now().timestamp().saturating_sub(retention_secs);
    ReadingRepo::delete_older_than(pool, cutoff).await
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    clock: Arc<dyn Clock>,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_days = retention.as_secs() / 86_400,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Reading retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reading retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_once(&pool, clock.as_ref(), retention).await {
                    Ok(0) => tracing::debug!("Reading retention: no rows to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Reading retention: purged old rows"),
                    Err(e) => tracing::error!(error = %e, "Reading retention: cleanup failed"),
                }
            }
        }
    }
}
