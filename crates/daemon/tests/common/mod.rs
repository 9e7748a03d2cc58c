#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use noisewatch_core::clock::ManualClock;
use noisewatch_core::policy::DevicePolicy;
use noisewatch_daemon::{DaemonConfig, Services};
use noisewatch_db::repositories::{DeviceRepo, PolicyRepo};
use noisewatch_db::DbPool;
use noisewatch_events::{DeliveryError, DeliveryReceipt, Notifier};

pub const DEVICE: &str = "c4:dd:57:66:95:60";
pub const START: i64 = 1_700_000_000;

/// Defaults with no environment at all.
pub fn config() -> DaemonConfig {
    DaemonConfig::from_lookup(|_| None).expect("default config")
}

/// Active policy: three readings above 2.0 within 10 s fire, then 30 min quiet.
pub fn policy() -> DevicePolicy {
    DevicePolicy {
        description: "Marktplatz".into(),
        alert_threshold: 2.0,
        alert_duration: 10,
        alert_count: 3,
        alert_deadtime: 1800,
        alert_phone: "+491701234567".into(),
        alert_active: true,
        ..DevicePolicy::new(DEVICE)
    }
}

pub async fn provision(pool: &DbPool, policy: &DevicePolicy) -> i64 {
    let id = DeviceRepo::get_or_create(pool, &policy.signifier).await.unwrap();
    PolicyRepo::upsert(pool, id, policy).await.unwrap();
    id
}

/// Records every send and answers "OK".
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
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
        Ok(DeliveryReceipt {
            status: "OK".into(),
        })
    }
}

pub struct Daemon {
    pub pool: DbPool,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

/// Provisioned database plus running services on a manual clock.
pub async fn start(pool: DbPool) -> Daemon {
    start_with(pool, &config()).await
}

pub async fn start_with(pool: DbPool, config: &DaemonConfig) -> Daemon {
    provision(&pool, &policy()).await;
    let clock = ManualClock::at_epoch(START);
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services::start(pool.clone(), config, notifier.clone(), Arc::new(clock.clone()))
        .await
        .expect("services start");
    Daemon {
        pool,
        clock,
        notifier,
        services,
    }
}

pub fn reading_line(signifier: &str, max: f64) -> String {
    format!(
        r#"{{"type":"reading","signifier":"{signifier}","min":1.0,"max":{max},"average":1.5,"average_var":0.1,"mean":1.4,"num":60}}"#
    )
}
