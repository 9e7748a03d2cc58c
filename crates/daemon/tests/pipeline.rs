mod common;

use std::time::Duration;

use common::{config, reading_line, start, start_with, DEVICE};
use noisewatch_core::alert::STATUS_OK;
use noisewatch_daemon::ingest::{self, IngestStats};
use noisewatch_daemon::DaemonConfig;
use noisewatch_db::repositories::{AlertRepo, DeviceRepo, ReadingRepo, TelemetryRepo};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

#[sqlx::test(migrations = "../../db/migrations")]
async fn stdin_lines_flow_through_to_one_alert(pool: SqlitePool) {
    let daemon = start(pool).await;
    let input = [
        reading_line(DEVICE, 5.0),
        r#"{"type":"telemetry","signifier":"c4:dd:57:66:95:60","kind":"esp","value":"51234"}"#.to_string(),
        "this is not json".to_string(),
        String::new(),
        reading_line(DEVICE, 5.0),
        reading_line("unknown-device", 99.0),
        reading_line(DEVICE, 5.0),
        reading_line(DEVICE, 5.0),
    ]
    .join("\n");

    let stats = ingest::run(input.as_bytes(), &daemon.services.distributor, CancellationToken::new()).await;
    assert_eq!(
        stats,
        IngestStats {
            lines: 8,
            published: 6,
            malformed: 1,
            undelivered: 0,
        }
    );

    assert!(daemon.services.shutdown(Duration::from_secs(5)).await);

    // Third exceeding reading fires, the fourth falls in the dead time.
    let sent = daemon.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "00491701234567");
    assert!(sent[0].0.ends_with("Marktplatz"));

    let ledger = AlertRepo::list_for_device(&daemon.pool, DEVICE, 10).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].status, STATUS_OK);
    assert_eq!(ledger[0].ts, daemon.clock.epoch_secs());

    let device = DeviceRepo::find_by_signifier(&daemon.pool, DEVICE)
        .await
        .unwrap()
        .unwrap();
    let readings = ReadingRepo::list_since(&daemon.pool, device.id, 0).await.unwrap();
    assert_eq!(readings.len(), 4);
    let telemetry = TelemetryRepo::list_for_device(&daemon.pool, device.id, 10).await.unwrap();
    assert_eq!(telemetry.len(), 1);
    assert_eq!(telemetry[0].kind, "esp");
    assert_eq!(telemetry[0].value, "51234");

    // Readings from devices without a policy are still stored.
    assert!(DeviceRepo::find_by_signifier(&daemon.pool, "unknown-device")
        .await
        .unwrap()
        .is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn input_larger_than_queue_is_stored_in_full(pool: SqlitePool) {
    const LINES: u64 = 200;
    let config = DaemonConfig {
        event_bus_capacity: 8,
        ..config()
    };
    let daemon = start_with(pool, &config).await;

    // Below the policy threshold so nothing fires.
    let input = (0..LINES)
        .map(|_| reading_line(DEVICE, 1.0))
        .collect::<Vec<_>>()
        .join("\n");
    let stats = ingest::run(input.as_bytes(), &daemon.services.distributor, CancellationToken::new()).await;
    assert_eq!(
        stats,
        IngestStats {
            lines: LINES,
            published: LINES,
            malformed: 0,
            undelivered: 0,
        }
    );
    assert!(daemon.services.shutdown(Duration::from_secs(5)).await);

    let device = DeviceRepo::find_by_signifier(&daemon.pool, DEVICE)
        .await
        .unwrap()
        .unwrap();
    let readings = ReadingRepo::list_since(&daemon.pool, device.id, 0).await.unwrap();
    assert_eq!(readings.len() as u64, LINES);
    assert!(daemon.notifier.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_ingest_reads_nothing(pool: SqlitePool) {
    let daemon = start(pool).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let input = reading_line(DEVICE, 5.0);
    let stats = ingest::run(input.as_bytes(), &daemon.services.distributor, cancel).await;
    assert_eq!(stats, IngestStats::default());

    daemon.services.shutdown(Duration::from_secs(1)).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ingest_stops_once_distributor_is_closed(pool: SqlitePool) {
    let daemon = start(pool).await;
    daemon.services.shutdown(Duration::from_secs(1)).await;

    let input = [reading_line(DEVICE, 5.0), reading_line(DEVICE, 5.0)].join("\n");
    let stats = ingest::run(input.as_bytes(), &daemon.services.distributor, CancellationToken::new()).await;
    assert_eq!(stats.lines, 1);
    assert_eq!(stats.published, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn shutdown_is_repeatable(pool: SqlitePool) {
    let daemon = start(pool).await;
    assert!(daemon.services.shutdown(Duration::from_secs(1)).await);
    assert!(daemon.services.shutdown(Duration::from_secs(1)).await);
}
