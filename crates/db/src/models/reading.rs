//! Stored reading model.

use noisewatch_core::reading::Reading;
use noisewatch_core::types::{from_epoch, DbId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `readings` table joined with its device's signifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredReading {
    pub id: DbId,
    pub device_id: DbId,
    pub signifier: String,
    pub ts: i64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub average_var: f64,
    pub mean: f64,
    pub num: i64,
}

impl StoredReading {
    /// Convert back to a domain reading with its stored capture time.
    pub fn to_reading(&self) -> Reading {
        Reading::new(self.signifier.clone())
            .with_stats(
                self.min,
                self.max,
                self.average,
                self.average_var,
                self.mean,
                self.num,
            )
            .captured_at(from_epoch(self.ts))
    }
}
