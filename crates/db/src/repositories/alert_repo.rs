//! Repository for the `alerts` ledger.

use noisewatch_core::alert::{Alert, STATUS_PENDING};
use noisewatch_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::alert::AlertRecord;

/// Column list for alert queries, joined with `devices` as `d`.
const COLUMNS: &str = "a.id, a.device_id, d.signifier, a.ts, a.target, a.message, a.status";

/// Provides append, outcome and audit queries for the alert ledger.
pub struct AlertRepo;

impl AlertRepo {
    /// Append a ledger row, returning its id.
    pub async fn insert(pool: &SqlitePool, device_id: DbId, alert: &Alert) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO alerts (device_id, ts, target, message, status) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING id",
        )
        .bind(device_id)
        .bind(alert.fired_at.timestamp())
        .bind(&alert.target)
        .bind(&alert.message)
        .bind(&alert.status)
        .fetch_one(pool)
        .await
    }

    /// Record the delivery outcome of a pending row.
    ///
    /// Only rows still in the pending state are updated; returns `false` if
    /// no such row exists.
    pub async fn update_status(pool: &SqlitePool, id: DbId, status: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE alerts SET status = ?2 WHERE id = ?1 AND status = ?3")
            .bind(id)
            .bind(status)
            .bind(STATUS_PENDING)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The most recent ledger row for a device. Ties on `ts` go to the
    /// highest id.
    pub async fn find_last_for_device(
        pool: &SqlitePool,
        signifier: &str,
    ) -> Result<Option<AlertRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts a \
             JOIN devices d ON d.id = a.device_id \
             WHERE d.signifier = ?1 \
             ORDER BY a.ts DESC, a.id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AlertRecord>(&query)
            .bind(signifier)
            .fetch_optional(pool)
            .await
    }

    /// Find a ledger row by id.
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<AlertRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts a \
             JOIN devices d ON d.id = a.device_id \
             WHERE a.id = ?1"
        );
        sqlx::query_as::<_, AlertRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a device's ledger, newest first.
    pub async fn list_for_device(
        pool: &SqlitePool,
        signifier: &str,
        limit: i64,
    ) -> Result<Vec<AlertRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts a \
             JOIN devices d ON d.id = a.device_id \
             WHERE d.signifier = ?1 \
             ORDER BY a.ts DESC, a.id DESC \
             LIMIT ?2"
        );
        sqlx::query_as::<_, AlertRecord>(&query)
            .bind(signifier)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
