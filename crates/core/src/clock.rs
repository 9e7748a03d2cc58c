//! Time sources for decision passes.
//!
//! The engine never calls `Utc::now()` directly; it asks a [`Clock`] so that
//! dead-time and window behaviour can be driven deterministically in tests
//! and replays.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::types::{from_epoch, Seconds, Timestamp};

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A manually advanced clock with whole-second resolution.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_secs: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at the given epoch second.
    pub fn at_epoch(secs: Seconds) -> Self {
        Self {
            epoch_secs: Arc::new(AtomicI64::new(secs)),
        }
    }

    /// Create a clock frozen at the current wall-clock second.
    pub fn starting_now() -> Self {
        Self::at_epoch(Utc::now().timestamp())
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance(&self, secs: Seconds) {
        self.epoch_secs.fetch_add(secs, Ordering::AcqRel);
    }

    /// Jump to an absolute epoch second.
    pub fn set(&self, secs: Seconds) {
        self.epoch_secs.store(secs, Ordering::Release);
    }

    pub fn epoch_secs(&self) -> Seconds {
        self.epoch_secs.load(Ordering::Acquire)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        from_epoch(self.epoch_secs())
    }
}
