//! Device policy model.

use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A `device_policies` row joined with its device's signifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DevicePolicyRow {
    pub device_id: DbId,
    pub signifier: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub alert_threshold: f64,
    pub alert_duration: i64,
    pub alert_count: i64,
    pub alert_deadtime: i64,
    pub alert_phone: String,
    pub alert_active: bool,
    pub turn_on_time: i64,
    pub updated_at: i64,
}

impl From<DevicePolicyRow> for DevicePolicy {
    fn from(row: DevicePolicyRow) -> Self {
        Self {
            signifier: row.signifier,
            description: row.description,
            latitude: row.latitude,
            longitude: row.longitude,
            alert_threshold: row.alert_threshold,
            alert_duration: row.alert_duration,
            alert_count: row.alert_count,
            alert_deadtime: row.alert_deadtime,
            alert_phone: row.alert_phone,
            alert_active: row.alert_active,
            turn_on_time: row.turn_on_time,
        }
    }
}
