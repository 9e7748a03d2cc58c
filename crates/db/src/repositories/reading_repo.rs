//! Repository for the `readings` table.

use noisewatch_core::reading::Reading;
use noisewatch_core::types::{DbId, Seconds};
use sqlx::SqlitePool;

use crate::models::reading::StoredReading;

/// Column list for reading queries, joined with `devices` as `d`.
const COLUMNS: &str = "\
    r.id, r.device_id, d.signifier, r.ts, r.min, r.max, \
    r.average, r.average_var, r.mean, r.num";

/// Provides append, exceedance and retention queries for readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Append a reading captured at `ts` (epoch seconds).
    pub async fn insert(
        pool: &SqlitePool,
        device_id: DbId,
        ts: Seconds,
        reading: &Reading,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO readings \
                (device_id, ts, min, max, average, average_var, mean, num) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             RETURNING id",
        )
        .bind(device_id)
        .bind(ts)
        .bind(reading.min)
        .bind(reading.max)
        .bind(reading.average)
        .bind(reading.average_var)
        .bind(reading.mean)
        .bind(reading.num)
        .fetch_one(pool)
        .await
    }

    /// Count readings with `ts > after` and `max > threshold`. Both bounds
    /// are strict.
    pub async fn count_exceeding(
        pool: &SqlitePool,
        device_id: DbId,
        after: Seconds,
        threshold: f64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM readings \
             WHERE device_id = ?1 AND ts > ?2 AND max > ?3",
        )
        .bind(device_id)
        .bind(after)
        .bind(threshold)
        .fetch_one(pool)
        .await
    }

    /// List a device's readings with `ts >= since`, oldest first.
    pub async fn list_since(
        pool: &SqlitePool,
        device_id: DbId,
        since: Seconds,
    ) -> Result<Vec<StoredReading>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM readings r \
             JOIN devices d ON d.id = r.device_id \
             WHERE r.device_id = ?1 AND r.ts >= ?2 \
             ORDER BY r.ts, r.id"
        );
        sqlx::query_as::<_, StoredReading>(&query)
            .bind(device_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Delete readings older than `cutoff` across all devices.
    ///
    /// Returns the number of deleted rows.
    pub async fn delete_older_than(pool: &SqlitePool, cutoff: Seconds) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM readings WHERE ts < ?1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
