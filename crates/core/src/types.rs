use chrono::{TimeZone, Utc};

/// All database primary keys are SQLite INTEGER PRIMARY KEY rowids.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Durations in policies and the exceedance window are whole seconds.
pub type Seconds = i64;

/// Convert stored epoch seconds back to a [`Timestamp`].
///
/// Values outside chrono's range map to the Unix epoch.
pub fn from_epoch(secs: Seconds) -> Timestamp {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
