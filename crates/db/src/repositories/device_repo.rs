//! Repository for the `devices` table.

use noisewatch_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::device::Device;

/// Column list for `devices` queries.
const COLUMNS: &str = "id, signifier, created_at";

/// Provides identity lookups and lazy creation for devices.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Find a device by signifier.
    pub async fn find_by_signifier(
        pool: &SqlitePool,
        signifier: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE signifier = ?1");
        sqlx::query_as::<_, Device>(&query)
            .bind(signifier)
            .fetch_optional(pool)
            .await
    }

    /// Return the id for `signifier`, creating the device if it is unseen.
    ///
    /// The insert is a no-op when the signifier already exists, so racing
    /// callers on separate connections still converge on one row.
    pub async fn get_or_create(pool: &SqlitePool, signifier: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query("INSERT INTO devices (signifier) VALUES (?1) ON CONFLICT (signifier) DO NOTHING")
            .bind(signifier)
            .execute(pool)
            .await?;

        sqlx::query_scalar("SELECT id FROM devices WHERE signifier = ?1")
            .bind(signifier)
            .fetch_one(pool)
            .await
    }

    /// List all devices ordered by id.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices ORDER BY id");
        sqlx::query_as::<_, Device>(&query).fetch_all(pool).await
    }
}
