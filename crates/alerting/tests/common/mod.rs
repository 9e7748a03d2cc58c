#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use noisewatch_alerting::{AlertEngine, AlertEngineConfig, NotificationDispatcher};
use noisewatch_core::alert::Alert;
use noisewatch_core::clock::ManualClock;
use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::reading::Reading;
use noisewatch_db::repositories::{AlertRepo, DeviceRepo, PolicyRepo};
use noisewatch_db::{DbPool, NoiseStore, SqliteStore};
use noisewatch_events::{DeliveryError, DeliveryReceipt, Notifier};

pub const DEVICE: &str = "c4:dd:57:66:95:60";
pub const PHONE: &str = "01701234567";
pub const START: i64 = 1_700_000_000;

/// Policy used by the end-to-end scenarios.
pub fn policy(deadtime: i64) -> DevicePolicy {
    DevicePolicy {
        description: "Marktplatz".into(),
        alert_threshold: 2.0,
        alert_duration: 10,
        alert_count: 5,
        alert_deadtime: deadtime,
        alert_phone: PHONE.into(),
        alert_active: true,
        ..DevicePolicy::new(DEVICE)
    }
}

pub async fn provision(pool: &DbPool, policy: &DevicePolicy) {
    let id = DeviceRepo::get_or_create(pool, &policy.signifier).await.unwrap();
    PolicyRepo::upsert(pool, id, policy).await.unwrap();
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Records every send and answers with a fixed outcome.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    fail_with_status: Option<u16>,
}

impl RecordingNotifier {
    pub fn ok() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with_status: None,
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str, target: &str) -> Result<DeliveryReceipt, DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), target.to_string()));
        match self.fail_with_status {
            Some(code) => Err(DeliveryError::HttpStatus(code)),
            None => Ok(DeliveryReceipt {
                status: "100".into(),
            }),
        }
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn send(&self, _message: &str, _target: &str) -> Result<DeliveryReceipt, DeliveryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(DeliveryReceipt {
            status: "too late".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub pool: DbPool,
    pub store: Arc<SqliteStore>,
    pub clock: ManualClock,
    pub dispatcher: NotificationDispatcher,
    pub engine: AlertEngine,
}

impl Harness {
    pub async fn new(pool: DbPool, policy: &DevicePolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(
            pool,
            policy,
            notifier,
            AlertEngineConfig::default(),
            Duration::from_secs(5),
        )
        .await
    }

    /// Provision `policy` in the migrated `pool` and wire the engine to it.
    pub async fn with_config(
        pool: DbPool,
        policy: &DevicePolicy,
        notifier: Arc<dyn Notifier>,
        config: AlertEngineConfig,
        timeout: Duration,
    ) -> Self {
        provision(&pool, policy).await;
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let clock = ManualClock::at_epoch(START);
        let dispatcher = NotificationDispatcher::new(notifier, store.clone(), timeout);
        let engine = AlertEngine::new(
            store.clone(),
            dispatcher.clone(),
            Arc::new(clock.clone()),
            config,
        );
        Self {
            pool,
            store,
            clock,
            dispatcher,
            engine,
        }
    }

    /// Persist a reading at the current clock time, then evaluate it.
    pub async fn ingest(&self, max: f64) -> noisewatch_core::decision::Decision {
        let reading = Reading::new(DEVICE).with_max(max);
        self.store
            .save_reading(&reading, self.clock_now())
            .await
            .unwrap();
        self.engine.evaluate(&reading).await.unwrap()
    }

    pub fn clock_now(&self) -> noisewatch_core::types::Timestamp {
        use noisewatch_core::clock::Clock;
        self.clock.now()
    }

    pub async fn ledger(&self) -> Vec<Alert> {
        AlertRepo::list_for_device(&self.pool, DEVICE, 100)
            .await
            .unwrap()
            .into_iter()
            .map(Alert::from)
            .collect()
    }
}
