//! The durable-store seam used by the decision engine and consumers.
//!
//! [`NoiseStore`] is the only interface the engine sees; [`SqliteStore`] is
//! the production implementation over the repositories. Tests substitute
//! their own implementations to inject failures.

use async_trait::async_trait;
use noisewatch_core::alert::Alert;
use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::reading::Reading;
use noisewatch_core::telemetry::Telemetry;
use noisewatch_core::types::{DbId, Seconds, Timestamp};
use sqlx::SqlitePool;

use crate::registry::DeviceRegistry;
use crate::repositories::{AlertRepo, PolicyRepo, ReadingRepo, TelemetryRepo};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by a [`NoiseStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Stored data violates a domain invariant.
    #[error("Invalid stored data: {0}")]
    Invalid(String),

    /// The backend failed; the caller may retry on the next event.
    #[error("Store unavailable: {0}")]
    Transient(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Durable storage operations needed by the alerting pipeline.
#[async_trait]
pub trait NoiseStore: Send + Sync {
    /// Load the current policy for a device. Never cached.
    async fn load_policy(&self, signifier: &str) -> Result<DevicePolicy, StoreError>;

    /// Resolve a signifier to its id, creating it on first sighting.
    async fn resolve_identity(&self, signifier: &str) -> Result<DbId, StoreError>;

    /// Append a ledger row and return its id.
    async fn append_alert(&self, alert: &Alert) -> Result<DbId, StoreError>;

    /// Set the final delivery status of a pending ledger row.
    async fn record_alert_outcome(&self, alert_id: DbId, status: &str) -> Result<(), StoreError>;

    /// The latest ledger row for a device, if any.
    async fn last_alert(&self, signifier: &str) -> Result<Option<Alert>, StoreError>;

    /// Readings with `ts > now - window` and `max > threshold`.
    async fn count_exceeding(
        &self,
        signifier: &str,
        window: Seconds,
        threshold: f64,
        now: Timestamp,
    ) -> Result<i64, StoreError>;

    /// Persist a reading. Missing capture times default to `ingested_at`.
    async fn save_reading(&self, reading: &Reading, ingested_at: Timestamp) -> Result<DbId, StoreError>;

    /// Persist a telemetry event. Missing capture times default to `ingested_at`.
    async fn save_telemetry(
        &self,
        telemetry: &Telemetry,
        ingested_at: Timestamp,
    ) -> Result<DbId, StoreError>;

    /// Turn on alerting for a device whose scheduled turn-on time has passed.
    async fn activate_policy(&self, signifier: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

/// [`NoiseStore`] backed by the SQLite repositories and a [`DeviceRegistry`].
pub struct SqliteStore {
    pool: SqlitePool,
    registry: DeviceRegistry,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        let registry = DeviceRegistry::new(pool.clone());
        Self { pool, registry }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }
}

#[async_trait]
impl NoiseStore for SqliteStore {
    async fn load_policy(&self, signifier: &str) -> Result<DevicePolicy, StoreError> {
        let row = PolicyRepo::find_by_signifier(&self.pool, signifier)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "policy",
                key: signifier.to_string(),
            })?;

        let policy = DevicePolicy::from(row);
        policy
            .validate()
            .map_err(|e| StoreError::Invalid(format!("policy for {signifier}: {e}")))?;
        Ok(policy)
    }

    async fn resolve_identity(&self, signifier: &str) -> Result<DbId, StoreError> {
        Ok(self.registry.resolve(signifier).await?)
    }

    async fn append_alert(&self, alert: &Alert) -> Result<DbId, StoreError> {
        let device_id = self.registry.resolve(&alert.signifier).await?;
        Ok(AlertRepo::insert(&self.pool, device_id, alert).await?)
    }

    async fn record_alert_outcome(&self, alert_id: DbId, status: &str) -> Result<(), StoreError> {
        if AlertRepo::update_status(&self.pool, alert_id, status).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "pending alert",
                key: alert_id.to_string(),
            })
        }
    }

    async fn last_alert(&self, signifier: &str) -> Result<Option<Alert>, StoreError> {
        let record = AlertRepo::find_last_for_device(&self.pool, signifier).await?;
        Ok(record.map(Alert::from))
    }

    async fn count_exceeding(
        &self,
        signifier: &str,
        window: Seconds,
        threshold: f64,
        now: Timestamp,
    ) -> Result<i64, StoreError> {
        let device_id = self.registry.resolve(signifier).await?;
        let after = now.timestamp().saturating_sub(window);
        Ok(ReadingRepo::count_exceeding(&self.pool, device_id, after, threshold).await?)
    }

    async fn save_reading(&self, reading: &Reading, ingested_at: Timestamp) -> Result<DbId, StoreError> {
        let device_id = self.registry.resolve(&reading.signifier).await?;
        let ts = reading.capture_time_or(ingested_at).timestamp();
        Ok(ReadingRepo::insert(&self.pool, device_id, ts, reading).await?)
    }

    async fn save_telemetry(
        &self,
        telemetry: &Telemetry,
        ingested_at: Timestamp,
    ) -> Result<DbId, StoreError> {
        let device_id = self.registry.resolve(&telemetry.signifier).await?;
        let ts = telemetry.captured_at.unwrap_or(ingested_at).timestamp();
        Ok(TelemetryRepo::insert(&self.pool, device_id, ts, telemetry).await?)
    }

    async fn activate_policy(&self, signifier: &str) -> Result<(), StoreError> {
        let device_id = self.registry.resolve(signifier).await?;
        if PolicyRepo::set_active(&self.pool, device_id, true).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "policy",
                key: signifier.to_string(),
            })
        }
    }
}
