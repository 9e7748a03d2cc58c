//! Stored telemetry model.

use noisewatch_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `telemetry` table. `kind` is the three-letter wire code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TelemetryRecord {
    pub id: DbId,
    pub device_id: DbId,
    pub ts: i64,
    pub kind: String,
    pub value: String,
}
