//! The alert decision engine.
//!
//! For each reading the engine runs one decision pass:
//!
//! 1. load the device policy (read through, never cached)
//! 2. activation gate
//! 3. threshold gate on the reading's maximum
//! 4. dead-time gate against the last ledger entry
//! 5. exceedance count over the policy window
//! 6. on fire: write a pending ledger row, hand the alert to the dispatcher
//!
//! Passes for one device are serialized by a per-device lock held across all
//! six steps, so the pending ledger row of a fired alert is visible to the
//! next pass's dead-time check. Passes for different devices run in
//! parallel. Locks are created on first use and pruned once idle; the engine
//! keeps no other per-device state.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use noisewatch_core::alert::{render_message, Alert, DEFAULT_MESSAGE_TEMPLATE};
use noisewatch_core::clock::Clock;
use noisewatch_core::decision::{
    activation_gate, deadtime_gate, evidence_gate, threshold_gate, Decision,
};
use noisewatch_core::error::CoreError;
use noisewatch_core::policy::Activation;
use noisewatch_core::reading::Reading;
use noisewatch_core::types::Timestamp;
use noisewatch_db::{NoiseStore, StoreError};
use noisewatch_events::DeviceObserver;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::dispatcher::NotificationDispatcher;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which instant a decision pass treats as "now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvaluationTime {
    /// The engine clock at the start of the pass.
    #[default]
    Now,
    /// The reading's capture time when present, else the engine clock.
    Reading,
}

impl FromStr for EvaluationTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "now" => Ok(Self::Now),
            "reading" => Ok(Self::Reading),
            other => Err(CoreError::InvalidFormat(format!(
                "evaluation time must be 'now' or 'reading', got {other:?}"
            ))),
        }
    }
}

/// Tunables for [`AlertEngine`].
#[derive(Debug, Clone)]
pub struct AlertEngineConfig {
    /// Message template; `{description}` is replaced per device.
    pub message_template: String,
    pub evaluation_time: EvaluationTime,
    /// Flip `alert_active` on once an inactive policy's turn-on time passes.
    pub auto_activate: bool,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self {
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            evaluation_time: EvaluationTime::Now,
            auto_activate: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AlertEngine
// ---------------------------------------------------------------------------

/// Decision engine observer. Cheap to clone; clones share locks and tasks.
#[derive(Clone)]
pub struct AlertEngine {
    inner: Arc<EngineInner>,
    passes: TaskTracker,
}

struct EngineInner {
    store: Arc<dyn NoiseStore>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    config: AlertEngineConfig,
    device_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AlertEngine {
    pub fn new(
        store: Arc<dyn NoiseStore>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        config: AlertEngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                dispatcher,
                clock,
                config,
                device_locks: StdMutex::new(HashMap::new()),
            }),
            passes: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &AlertEngineConfig {
        &self.inner.config
    }

    /// Run one decision pass for `reading` and wait for its result.
    pub async fn evaluate(&self, reading: &Reading) -> Result<Decision, StoreError> {
        let lock = self.inner.device_lock(&reading.signifier);
        let _guard = lock.lock().await;
        self.inner.decide(reading).await
    }

    /// Wait until every pass started by [`on_reading`](DeviceObserver::on_reading)
    /// has finished.
    pub async fn drain(&self) {
        self.passes.close();
        self.passes.wait().await;
        self.passes.reopen();
    }
}

#[async_trait]
impl DeviceObserver for AlertEngine {
    fn name(&self) -> &str {
        "alert-engine"
    }

    /// Take the device lock in arrival order, then finish the pass in its own
    /// task so other devices are not held up.
    async fn on_reading(&self, reading: &Reading, _received_at: Timestamp) {
        let guard = self
            .inner
            .device_lock(&reading.signifier)
            .lock_owned()
            .await;
        let inner = Arc::clone(&self.inner);
        let reading = reading.clone();

        self.passes.spawn(async move {
            let result = inner.decide(&reading).await;
            drop(guard);
            log_outcome(&reading, result);
        });
    }
}

impl EngineInner {
    fn device_lock(&self, signifier: &str) -> Arc<Mutex<()>> {
        // No invariant spans the map, so a poisoned guard is still usable.
        let mut locks = self
            .device_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(lock) = locks.get(signifier) {
            return Arc::clone(lock);
        }
        prune_idle_locks(&mut locks);
        Arc::clone(locks.entry(signifier.to_string()).or_default())
    }

    fn evaluation_now(&self, reading: &Reading) -> Timestamp {
        let now = self.clock.now();
        match self.config.evaluation_time {
            EvaluationTime::Now => now,
            EvaluationTime::Reading => reading.capture_time_or(now),
        }
    }

    /// One decision pass. The caller holds the device lock.
    async fn decide(&self, reading: &Reading) -> Result<Decision, StoreError> {
        let signifier = reading.signifier.as_str();
        let policy = self.store.load_policy(signifier).await?;
        let now = self.evaluation_now(reading);

        match activation_gate(&policy, now) {
            Err(skip) => return Ok(skip),
            Ok(Activation::Due) if self.config.auto_activate => {
                match self.store.activate_policy(signifier).await {
                    Ok(()) => tracing::info!(signifier = %signifier, "Alerting auto-activated"),
                    Err(e) => tracing::error!(
                        error = %e,
                        signifier = %signifier,
                        "Failed to auto-activate alerting"
                    ),
                }
            }
            Ok(_) => {}
        }

        if let Err(skip) = threshold_gate(&policy, reading.max) {
            return Ok(skip);
        }

        let last = self.store.last_alert(signifier).await?;
        if let Err(skip) = deadtime_gate(&policy, last.map(|a| a.fired_at), now) {
            return Ok(skip);
        }

        let count = self
            .store
            .count_exceeding(signifier, policy.alert_duration, policy.alert_threshold, now)
            .await?;
        let decision = evidence_gate(&policy, count);
        if !decision.is_fire() {
            return Ok(decision);
        }

        let message = render_message(&self.config.message_template, &policy);
        let alert = Alert::pending(&policy, now, message);
        let alert_id = self.store.append_alert(&alert).await?;
        tracing::info!(
            signifier = %signifier,
            alert_id,
            count,
            target = %alert.target,
            "Alert fired"
        );
        self.dispatcher.dispatch(alert_id, alert);

        Ok(decision)
    }
}

/// Drop locks nobody holds or waits on. Handles are only cloned under the
/// map guard, so a strong count of one means the map owns the only copy.
fn prune_idle_locks(locks: &mut HashMap<String, Arc<Mutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

fn log_outcome(reading: &Reading, result: Result<Decision, StoreError>) {
    match result {
        Ok(decision) if decision.is_fire() => {}
        Ok(decision) => tracing::debug!(
            signifier = %reading.signifier,
            max = reading.max,
            decision = %decision,
            "No alert"
        ),
        Err(StoreError::NotFound { entity, key }) => tracing::warn!(
            signifier = %reading.signifier,
            entity,
            key = %key,
            "Skipping reading, no policy"
        ),
        Err(e) => tracing::error!(
            error = %e,
            signifier = %reading.signifier,
            "Decision pass failed, skipping reading"
        ),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn evaluation_time_parses() {
        assert_eq!("now".parse::<EvaluationTime>().unwrap(), EvaluationTime::Now);
        assert_eq!(" Reading ".parse::<EvaluationTime>().unwrap(), EvaluationTime::Reading);
        assert_matches!("later".parse::<EvaluationTime>(), Err(CoreError::InvalidFormat(_)));
    }

    #[test]
    fn idle_locks_are_pruned_held_ones_kept() {
        let mut locks: HashMap<String, Arc<Mutex<()>>> = HashMap::new();
        locks.insert("idle".into(), Arc::default());
        let held = Arc::new(Mutex::new(()));
        locks.insert("held".into(), Arc::clone(&held));

        prune_idle_locks(&mut locks);

        assert!(!locks.contains_key("idle"));
        assert!(Arc::ptr_eq(&locks["held"], &held));
    }

    #[test]
    fn default_config_uses_default_template() {
        let config = AlertEngineConfig::default();
        assert_eq!(config.message_template, DEFAULT_MESSAGE_TEMPLATE);
        assert_eq!(config.evaluation_time, EvaluationTime::Now);
        assert!(!config.auto_activate);
    }
}
