//! Repository for the `telemetry` table.

use noisewatch_core::telemetry::Telemetry;
use noisewatch_core::types::{DbId, Seconds};
use sqlx::SqlitePool;

use crate::models::telemetry::TelemetryRecord;

/// Column list for `telemetry` queries.
const COLUMNS: &str = "id, device_id, ts, kind, value";

pub struct TelemetryRepo;

impl TelemetryRepo {
    /// Append a telemetry event captured at `ts` (epoch seconds).
    pub async fn insert(
        pool: &SqlitePool,
        device_id: DbId,
        ts: Seconds,
        telemetry: &Telemetry,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO telemetry (device_id, ts, kind, value) \
             VALUES (?1, ?2, ?3, ?4) \
             RETURNING id",
        )
        .bind(device_id)
        .bind(ts)
        .bind(telemetry.kind.code())
        .bind(telemetry.value.to_text())
        .fetch_one(pool)
        .await
    }

    /// List a device's telemetry, newest first.
    pub async fn list_for_device(
        pool: &SqlitePool,
        device_id: DbId,
        limit: i64,
    ) -> Result<Vec<TelemetryRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telemetry \
             WHERE device_id = ?1 \
             ORDER BY ts DESC, id DESC \
             LIMIT ?2"
        );
        sqlx::query_as::<_, TelemetryRecord>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
