//! Repository for the `device_policies` table.

use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::policy::DevicePolicyRow;

/// Column list for policy queries, joined with `devices` as `d`.
const COLUMNS: &str = "\
    p.device_id, d.signifier, p.description, p.latitude, p.longitude, \
    p.alert_threshold, p.alert_duration, p.alert_count, p.alert_deadtime, \
    p.alert_phone, p.alert_active, p.turn_on_time, p.updated_at";

/// Provides policy reads for the engine and provisioning writes for operators.
pub struct PolicyRepo;

impl PolicyRepo {
    /// Load the policy of the device with the given signifier.
    pub async fn find_by_signifier(
        pool: &SqlitePool,
        signifier: &str,
    ) -> Result<Option<DevicePolicyRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_policies p \
             JOIN devices d ON d.id = p.device_id \
             WHERE d.signifier = ?1"
        );
        sqlx::query_as::<_, DevicePolicyRow>(&query)
            .bind(signifier)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the policy for `device_id`.
    pub async fn upsert(
        pool: &SqlitePool,
        device_id: DbId,
        policy: &DevicePolicy,
    ) -> Result<DevicePolicyRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO device_policies \
                (device_id, description, latitude, longitude, alert_threshold, \
                 alert_duration, alert_count, alert_deadtime, alert_phone, \
                 alert_active, turn_on_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT (device_id) DO UPDATE SET \
                description = excluded.description, \
                latitude = excluded.latitude, \
                longitude = excluded.longitude, \
                alert_threshold = excluded.alert_threshold, \
                alert_duration = excluded.alert_duration, \
                alert_count = excluded.alert_count, \
                alert_deadtime = excluded.alert_deadtime, \
                alert_phone = excluded.alert_phone, \
                alert_active = excluded.alert_active, \
                turn_on_time = excluded.turn_on_time, \
                updated_at = CAST(strftime('%s', 'now') AS INTEGER)",
        )
        .bind(device_id)
        .bind(&policy.description)
        .bind(policy.latitude)
        .bind(policy.longitude)
        .bind(policy.alert_threshold)
        .bind(policy.alert_duration)
        .bind(policy.alert_count)
        .bind(policy.alert_deadtime)
        .bind(&policy.alert_phone)
        .bind(policy.alert_active)
        .bind(policy.turn_on_time)
        .execute(pool)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM device_policies p \
             JOIN devices d ON d.id = p.device_id \
             WHERE p.device_id = ?1"
        );
        sqlx::query_as::<_, DevicePolicyRow>(&query)
            .bind(device_id)
            .fetch_one(pool)
            .await
    }

    /// Flip the kill switch. Returns `false` if the device has no policy.
    pub async fn set_active(
        pool: &SqlitePool,
        device_id: DbId,
        active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE device_policies \
             SET alert_active = ?2, updated_at = CAST(strftime('%s', 'now') AS INTEGER) \
             WHERE device_id = ?1",
        )
        .bind(device_id)
        .bind(active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
