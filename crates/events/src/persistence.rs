//! Durable reading and telemetry persistence.
//!
//! [`ReadingPersistence`] is registered on the
//! [`EventDistributor`](crate::bus::EventDistributor) and writes every
//! received reading and telemetry event through a [`NoiseStore`]. Failures
//! are logged and the event is dropped; ingestion never stops.
//!
//! An optional downstream observer receives each event after its write has
//! completed, so a consumer that queries stored readings (the alert engine)
//! always sees the reading it is handling.

use std::sync::Arc;

use async_trait::async_trait;
use noisewatch_core::reading::Reading;
use noisewatch_core::telemetry::Telemetry;
use noisewatch_core::types::Timestamp;
use noisewatch_db::NoiseStore;

use crate::bus::DeviceObserver;

/// Observer that persists device events.
pub struct ReadingPersistence {
    store: Arc<dyn NoiseStore>,
    downstream: Option<Arc<dyn DeviceObserver>>,
}

impl ReadingPersistence {
    pub fn new(store: Arc<dyn NoiseStore>) -> Self {
        Self {
            store,
            downstream: None,
        }
    }

    /// Forward every event to `next` once it has been written.
    ///
    /// Events whose write failed are forwarded too.
    pub fn forwarding_to(mut self, next: Arc<dyn DeviceObserver>) -> Self {
        self.downstream = Some(next);
        self
    }
}

#[async_trait]
impl DeviceObserver for ReadingPersistence {
    fn name(&self) -> &str {
        "persistence"
    }

    async fn on_reading(&self, reading: &Reading, received_at: Timestamp) {
        if let Err(e) = self.store.save_reading(reading, received_at).await {
            tracing::error!(
                error = %e,
                signifier = %reading.signifier,
                "Failed to persist reading"
            );
        }
        if let Some(next) = &self.downstream {
            next.on_reading(reading, received_at).await;
        }
    }

    async fn on_telemetry(&self, telemetry: &Telemetry, received_at: Timestamp) {
        match self.store.save_telemetry(telemetry, received_at).await {
            Ok(_) => tracing::debug!(
                signifier = %telemetry.signifier,
                kind = %telemetry.kind.description(),
                "Telemetry persisted"
            ),
            Err(e) => tracing::error!(
                error = %e,
                signifier = %telemetry.signifier,
                kind = telemetry.kind.code(),
                "Failed to persist telemetry"
            ),
        }
        if let Some(next) = &self.downstream {
            next.on_telemetry(telemetry, received_at).await;
        }
    }
}
