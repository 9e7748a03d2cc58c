mod common;

use assert_matches::assert_matches;
use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::telemetry::{Telemetry, TelemetryKind, TelemetryValue};
use noisewatch_db::repositories::TelemetryRepo;
use noisewatch_db::{NoiseStore, SqliteStore, StoreError};
use sqlx::SqlitePool;

use common::at;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_load_policy_reads_through(pool: SqlitePool) {
    let policy = DevicePolicy {
        description: "Marktplatz".into(),
        alert_threshold: 85.5,
        alert_active: true,
        ..DevicePolicy::new("dev")
    };
    let id = common::provision(&pool, &policy).await;
    let store = SqliteStore::new(pool.clone());

    assert_eq!(store.load_policy("dev").await.unwrap(), policy);

    // Edits made behind the store's back are visible on the next load.
    noisewatch_db::repositories::PolicyRepo::set_active(&pool, id, false)
        .await
        .unwrap();
    assert!(!store.load_policy("dev").await.unwrap().alert_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_device_policy_is_not_found(pool: SqlitePool) {
    let store = SqliteStore::new(pool);
    assert_matches!(
        store.load_policy("ghost").await,
        Err(StoreError::NotFound { entity: "policy", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_device_without_policy_is_not_found(pool: SqlitePool) {
    let store = SqliteStore::new(pool);
    store.resolve_identity("bare").await.unwrap();
    assert_matches!(store.load_policy("bare").await, Err(StoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_activate_policy_sets_flag(pool: SqlitePool) {
    common::provision(
        &pool,
        &DevicePolicy {
            turn_on_time: 10,
            ..DevicePolicy::new("dev")
        },
    )
    .await;
    let store = SqliteStore::new(pool);

    store.activate_policy("dev").await.unwrap();
    assert!(store.load_policy("dev").await.unwrap().alert_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_activate_without_policy_is_not_found(pool: SqlitePool) {
    let store = SqliteStore::new(pool);
    assert_matches!(store.activate_policy("nobody").await, Err(StoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_telemetry_stores_wire_code(pool: SqlitePool) {
    let store = SqliteStore::new(pool);
    let event = Telemetry::new("dev", TelemetryKind::Flags, TelemetryValue::Integer(255))
        .captured_at(at(50));
    store.save_telemetry(&event, at(60)).await.unwrap();

    let id = store.resolve_identity("dev").await.unwrap();
    let rows = TelemetryRepo::list_for_device(store.pool(), id, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "flg");
    assert_eq!(rows[0].value, "255");
    assert_eq!(rows[0].ts, 50);
}
