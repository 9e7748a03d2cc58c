mod common;

use std::sync::Arc;

use noisewatch_db::repositories::DeviceRepo;
use noisewatch_db::DeviceRegistry;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_resolve_creates_then_caches(pool: SqlitePool) {
    let registry = DeviceRegistry::new(pool.clone());

    assert!(registry.cached("c4:dd:57").await.is_none());
    let id = registry.resolve("c4:dd:57").await.unwrap();
    assert_eq!(registry.cached("c4:dd:57").await, Some(id));
    assert_eq!(registry.resolve("c4:dd:57").await.unwrap(), id);

    let stored = DeviceRepo::find_by_signifier(&pool, "c4:dd:57")
        .await
        .unwrap()
        .expect("device row");
    assert_eq!(stored.id, id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_distinct_signifiers_get_distinct_ids(pool: SqlitePool) {
    let registry = DeviceRegistry::new(pool);

    let a = registry.resolve("a").await.unwrap();
    let b = registry.resolve("b").await.unwrap();
    assert_ne!(a, b);
    assert_eq!(registry.len().await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_existing_rows_are_reused_by_fresh_registry(pool: SqlitePool) {
    let id = DeviceRepo::get_or_create(&pool, "known").await.unwrap();

    let registry = DeviceRegistry::new(pool);
    assert_eq!(registry.resolve("known").await.unwrap(), id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_first_sightings_yield_one_id(pool: SqlitePool) {
    let registry = Arc::new(DeviceRegistry::new(pool.clone()));

    let tasks = (0..16).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.resolve("fresh-device").await.unwrap() })
    });
    let ids: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]), "ids diverged: {ids:?}");
    assert_eq!(DeviceRepo::list(&pool).await.unwrap().len(), 1);
}
