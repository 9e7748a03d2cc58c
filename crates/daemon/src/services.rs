//! Long-lived services and their wiring.
//!
//! ```text
//! ingest ──> EventDistributor ──> ReadingPersistence ──> AlertEngine ──> NotificationDispatcher
//! ```
//!
//! The engine sits behind persistence so a reading is stored before its own
//! exceedance count is taken.

use std::sync::Arc;
use std::time::Duration;

use noisewatch_alerting::{AlertEngine, NotificationDispatcher};
use noisewatch_core::clock::Clock;
use noisewatch_db::{DbPool, NoiseStore, SqliteStore};
use noisewatch_events::{DistributorError, EventDistributor, Notifier, ReadingPersistence};

use crate::config::DaemonConfig;

/// Handles to the running pipeline.
pub struct Services {
    pub store: Arc<SqliteStore>,
    pub distributor: Arc<EventDistributor>,
    pub engine: AlertEngine,
    pub dispatcher: NotificationDispatcher,
}

impl Services {
    /// Build the pipeline on `pool` and register its observers.
    pub async fn start(
        pool: DbPool,
        config: &DaemonConfig,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DistributorError> {
        let store = Arc::new(SqliteStore::new(pool));
        let dyn_store: Arc<dyn NoiseStore> = store.clone();

        let dispatcher =
            NotificationDispatcher::new(notifier, Arc::clone(&dyn_store), config.sms.timeout);
        let engine = AlertEngine::new(
            Arc::clone(&dyn_store),
            dispatcher.clone(),
            Arc::clone(&clock),
            config.engine.clone(),
        );

        let distributor = Arc::new(EventDistributor::new(config.event_bus_capacity, clock));
        let persistence = ReadingPersistence::new(dyn_store).forwarding_to(Arc::new(engine.clone()));
        distributor.register(Arc::new(persistence)).await?;

        tracing::info!(
            capacity = config.event_bus_capacity,
            evaluation_time = ?config.engine.evaluation_time,
            auto_activate = config.engine.auto_activate,
            "Services started"
        );

        Ok(Self {
            store,
            distributor,
            engine,
            dispatcher,
        })
    }

    /// Stop accepting events, let queued events finish, then wait up to
    /// `limit` for in-flight notifications.
    ///
    /// Returns `false` if notifications were still running at the limit.
    pub async fn shutdown(&self, limit: Duration) -> bool {
        self.distributor.shutdown().await;
        self.engine.drain().await;
        let finished = self.dispatcher.shutdown(limit).await;
        tracing::info!(finished, "Services shut down");
        finished
    }
}
