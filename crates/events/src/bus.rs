//! In-process fan-out of device events to registered observers.
//!
//! [`EventDistributor`] keeps one bounded queue and one task per registered
//! [`DeviceObserver`]. Publishing stamps the event with the ingestion time
//! and pushes it onto every queue, waiting for space when a queue is full,
//! so every observer sees every event and a slow observer pushes back on the
//! publisher instead of losing data. Each observer handles its own queue
//! sequentially, in publication order. It is designed to be shared via
//! `Arc<EventDistributor>`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use noisewatch_core::clock::{Clock, SystemClock};
use noisewatch_core::reading::Reading;
use noisewatch_core::telemetry::Telemetry;
use noisewatch_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Default per-observer queue capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// How long unregister/shutdown wait for a draining observer to handle its
/// next event before giving up on it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// DeviceEvent
// ---------------------------------------------------------------------------

/// An event from a device, stamped with the time it entered the process.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Reading {
        reading: Reading,
        received_at: Timestamp,
    },
    Telemetry {
        telemetry: Telemetry,
        received_at: Timestamp,
    },
}

impl DeviceEvent {
    pub fn signifier(&self) -> &str {
        match self {
            Self::Reading { reading, .. } => &reading.signifier,
            Self::Telemetry { telemetry, .. } => &telemetry.signifier,
        }
    }

    pub fn received_at(&self) -> Timestamp {
        match self {
            Self::Reading { received_at, .. } | Self::Telemetry { received_at, .. } => *received_at,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceObserver
// ---------------------------------------------------------------------------

/// A consumer of device events.
///
/// Handlers must deal with their own failures; the distributor only logs
/// panics and keeps delivering.
#[async_trait]
pub trait DeviceObserver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn on_reading(&self, reading: &Reading, received_at: Timestamp);

    /// Telemetry is ignored unless an observer opts in.
    async fn on_telemetry(&self, _telemetry: &Telemetry, _received_at: Timestamp) {}
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handle returned by [`EventDistributor::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DistributorError {
    #[error("Event distributor is shut down")]
    Closed,

    #[error("Unknown observer: {0}")]
    UnknownObserver(ObserverId),
}

// ---------------------------------------------------------------------------
// EventDistributor
// ---------------------------------------------------------------------------

struct Registration {
    name: String,
    sender: mpsc::Sender<DeviceEvent>,
    task_handle: JoinHandle<()>,
    /// Events the observer task has finished handling.
    handled: Arc<AtomicU64>,
}

/// Fan-out hub for [`DeviceEvent`]s.
pub struct EventDistributor {
    /// `None` once [`shutdown`](Self::shutdown) has run.
    observers: RwLock<Option<HashMap<ObserverId, Registration>>>,
    next_id: AtomicU64,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl EventDistributor {
    /// Create a distributor with a specific per-observer queue capacity.
    ///
    /// When an observer's queue is full, `publish` waits until it has room.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            observers: RwLock::new(Some(HashMap::new())),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            clock,
        }
    }

    /// Register an observer. It receives every event published after this
    /// call returns, until it is unregistered.
    pub async fn register(
        &self,
        observer: Arc<dyn DeviceObserver>,
    ) -> Result<ObserverId, DistributorError> {
        let mut guard = self.observers.write().await;
        let observers = guard.as_mut().ok_or(DistributorError::Closed)?;

        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = observer.name().to_string();
        let (sender, receiver) = mpsc::channel(self.capacity);
        let handled = Arc::new(AtomicU64::new(0));
        let task_handle = tokio::spawn(run_observer(observer, receiver, Arc::clone(&handled)));

        tracing::info!(observer = %name, id = %id, "Observer registered");
        observers.insert(
            id,
            Registration {
                name,
                sender,
                task_handle,
                handled,
            },
        );
        Ok(id)
    }

    /// Remove an observer.
    ///
    /// Events already queued for it are still handled; returns once its task
    /// has drained, or has stopped making progress.
    pub async fn unregister(&self, id: ObserverId) -> Result<(), DistributorError> {
        let registration = {
            let mut guard = self.observers.write().await;
            let observers = guard.as_mut().ok_or(DistributorError::Closed)?;
            observers
                .remove(&id)
                .ok_or(DistributorError::UnknownObserver(id))?
        };

        tracing::info!(observer = %registration.name, id = %id, "Observer unregistered");
        drain(registration).await;
        Ok(())
    }

    /// Publish a reading to all registered observers, waiting for queue
    /// space where needed.
    ///
    /// Returns how many observers accepted the event.
    pub async fn publish(&self, reading: Reading) -> Result<usize, DistributorError> {
        let event = DeviceEvent::Reading {
            reading,
            received_at: self.clock.now(),
        };
        self.publish_event(event).await
    }

    /// Publish a telemetry event to all registered observers.
    pub async fn publish_telemetry(&self, telemetry: Telemetry) -> Result<usize, DistributorError> {
        let event = DeviceEvent::Telemetry {
            telemetry,
            received_at: self.clock.now(),
        };
        self.publish_event(event).await
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers
            .read()
            .await
            .as_ref()
            .map_or(0, HashMap::len)
    }

    /// Stop accepting events and wait for every observer to drain.
    ///
    /// Idempotent. Later `publish` and `register` calls fail with
    /// [`DistributorError::Closed`].
    pub async fn shutdown(&self) {
        let Some(observers) = self.observers.write().await.take() else {
            return;
        };

        tracing::info!(observers = observers.len(), "Shutting down event distributor");
        for (id, registration) in observers {
            tracing::debug!(observer = %registration.name, id = %id, "Draining observer");
            drain(registration).await;
        }
        tracing::info!("Event distributor shut down complete");
    }

    // ---- private helpers ----

    async fn publish_event(&self, event: DeviceEvent) -> Result<usize, DistributorError> {
        let guard = self.observers.read().await;
        let observers = guard.as_ref().ok_or(DistributorError::Closed)?;

        let mut delivered = 0;
        for (id, registration) in observers {
            match registration.sender.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        observer = %registration.name,
                        id = %id,
                        signifier = %event.signifier(),
                        "Observer task has exited, event dropped"
                    );
                }
            }
        }
        Ok(delivered)
    }
}

impl Default for EventDistributor {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Arc::new(SystemClock))
    }
}

/// Close an observer's queue and wait for its task to finish.
///
/// The task is only aborted if it handles no event for a whole
/// [`DRAIN_TIMEOUT`].
async fn drain(registration: Registration) {
    let Registration {
        name,
        sender,
        mut task_handle,
        handled,
    } = registration;
    drop(sender);

    let mut last_seen = handled.load(Ordering::Acquire);
    loop {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut task_handle).await.is_ok() {
            return;
        }
        let now_seen = handled.load(Ordering::Acquire);
        if now_seen == last_seen {
            tracing::warn!(observer = %name, "Observer stalled while draining, aborting");
            task_handle.abort();
            return;
        }
        tracing::debug!(
            observer = %name,
            handled = now_seen - last_seen,
            "Observer still draining"
        );
        last_seen = now_seen;
    }
}

/// Per-observer loop. Exits when the queue is closed and empty.
async fn run_observer(
    observer: Arc<dyn DeviceObserver>,
    mut receiver: mpsc::Receiver<DeviceEvent>,
    handled: Arc<AtomicU64>,
) {
    while let Some(event) = receiver.recv().await {
        let outcome = AssertUnwindSafe(handle(observer.as_ref(), &event))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            tracing::error!(
                observer = %observer.name(),
                signifier = %event.signifier(),
                panic = %panic_message(panic.as_ref()),
                "Observer panicked while handling event"
            );
        }
        handled.fetch_add(1, Ordering::Release);
    }
    tracing::debug!(observer = %observer.name(), "Observer queue closed");
}

async fn handle(observer: &dyn DeviceObserver, event: &DeviceEvent) {
    match event {
        DeviceEvent::Reading {
            reading,
            received_at,
        } => observer.on_reading(reading, *received_at).await,
        DeviceEvent::Telemetry {
            telemetry,
            received_at,
        } => observer.on_telemetry(telemetry, *received_at).await,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
