//! Signifier-to-identity cache.

use std::collections::HashMap;

use noisewatch_core::types::DbId;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::repositories::DeviceRepo;

/// Maps device signifiers to their numeric ids.
///
/// Ids are created lazily on first sighting and cached for the lifetime of
/// the registry. Lookup and create-on-miss run under one lock, so concurrent
/// first sightings of a signifier observe exactly one id. Designed to be
/// owned by a store and shared through it.
pub struct DeviceRegistry {
    pool: SqlitePool,
    cache: Mutex<HashMap<String, DbId>>,
}

impl DeviceRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a signifier to its id, creating the device if it is unseen.
    pub async fn resolve(&self, signifier: &str) -> Result<DbId, sqlx::Error> {
        let mut cache = self.cache.lock().await;
        if let Some(&id) = cache.get(signifier) {
            return Ok(id);
        }

        let id = DeviceRepo::get_or_create(&self.pool, signifier).await?;
        cache.insert(signifier.to_string(), id);
        tracing::debug!(signifier = %signifier, device_id = id, "Device identity cached");
        Ok(id)
    }

    /// Cached id for a signifier, without touching storage.
    pub async fn cached(&self, signifier: &str) -> Option<DbId> {
        self.cache.lock().await.get(signifier).copied()
    }

    /// Number of cached identities.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }
}
