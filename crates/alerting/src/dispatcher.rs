//! Fire-and-forget alert delivery.
//!
//! [`NotificationDispatcher::dispatch`] takes an owned copy of a fired alert
//! whose pending ledger row already exists, and delivers it in a detached
//! task bounded by a timeout. Whatever happens, the task writes the outcome
//! to that ledger row. Delivery is never retried.

use std::sync::Arc;
use std::time::Duration;

use noisewatch_core::alert::Alert;
use noisewatch_core::types::DbId;
use noisewatch_db::NoiseStore;
use noisewatch_events::{DeliveryError, Notifier};
use tokio_util::task::TaskTracker;

/// Sends alerts through a [`Notifier`] without blocking the caller.
///
/// Cheap to clone; clones share the same set of in-flight deliveries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn NoiseStore>,
    timeout: Duration,
    tracker: TaskTracker,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, store: Arc<dyn NoiseStore>, timeout: Duration) -> Self {
        Self {
            notifier,
            store,
            timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Deliver `alert` in the background and record the outcome on ledger
    /// row `alert_id`.
    pub fn dispatch(&self, alert_id: DbId, alert: Alert) {
        let notifier = Arc::clone(&self.notifier);
        let store = Arc::clone(&self.store);
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            let status = deliver(notifier.as_ref(), &alert, timeout).await;
            if let Err(e) = store.record_alert_outcome(alert_id, &status).await {
                tracing::error!(
                    error = %e,
                    alert_id,
                    signifier = %alert.signifier,
                    status = %status,
                    "Failed to record alert outcome"
                );
            }
        });
    }

    /// Number of deliveries still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every delivery dispatched so far has recorded its outcome.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait for in-flight deliveries, giving up after `limit`.
    ///
    /// Returns `false` if some deliveries were still running.
    pub async fn shutdown(&self, limit: Duration) -> bool {
        let pending = self.in_flight();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight notifications");
        }
        self.tracker.close();
        let finished = tokio::time::timeout(limit, self.tracker.wait()).await.is_ok();
        if !finished {
            tracing::warn!(
                pending = self.in_flight(),
                "Notifications still in flight at shutdown"
            );
        }
        finished
    }
}

/// Run one delivery attempt and turn its outcome into a ledger status.
async fn deliver(notifier: &dyn Notifier, alert: &Alert, timeout: Duration) -> String {
    let outcome = tokio::time::timeout(timeout, notifier.send(&alert.message, &alert.target))
        .await
        .unwrap_or(Err(DeliveryError::TimedOut(timeout)));

    match outcome {
        Ok(receipt) => {
            tracing::info!(
                signifier = %alert.signifier,
                status = %receipt.status,
                "Alert delivered"
            );
            receipt.status
        }
        Err(e @ DeliveryError::MissingApiKey) => {
            tracing::warn!(signifier = %alert.signifier, "Alert not sent, no SMS API key configured");
            e.to_string()
        }
        Err(e) => {
            tracing::error!(error = %e, signifier = %alert.signifier, "Alert delivery failed");
            e.to_string()
        }
    }
}
