#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use noisewatch_core::policy::DevicePolicy;
use noisewatch_core::types::{DbId, Timestamp};
use noisewatch_db::repositories::{DeviceRepo, PolicyRepo};
use noisewatch_db::DbPool;

pub fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Create a device with the given policy and return its id.
pub async fn provision(pool: &DbPool, policy: &DevicePolicy) -> DbId {
    let id = DeviceRepo::get_or_create(pool, &policy.signifier)
        .await
        .expect("device insert");
    PolicyRepo::upsert(pool, id, policy)
        .await
        .expect("policy upsert");
    id
}
