//! Alert ledger model.

use noisewatch_core::alert::Alert;
use noisewatch_core::types::{from_epoch, DbId};
use serde::Serialize;
use sqlx::FromRow;

/// An `alerts` row joined with its device's signifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertRecord {
    pub id: DbId,
    pub device_id: DbId,
    pub signifier: String,
    pub ts: i64,
    pub target: String,
    pub message: String,
    pub status: String,
}

impl From<AlertRecord> for Alert {
    fn from(row: AlertRecord) -> Self {
        Self {
            signifier: row.signifier,
            fired_at: from_epoch(row.ts),
            target: row.target,
            message: row.message,
            status: row.status,
        }
    }
}
