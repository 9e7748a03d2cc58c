//! Device identity model.

use noisewatch_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `devices` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    pub signifier: String,
    pub created_at: i64,
}
