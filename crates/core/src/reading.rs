//! Summary-statistics readings reported by noise sensors.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One dB(A) summary sample from a device.
///
/// Constructed via [`Reading::new`] and enriched with
/// [`with_stats`](Reading::with_stats), [`with_max`](Reading::with_max) and
/// [`captured_at`](Reading::captured_at). Readings are immutable once they
/// enter the distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Device signifier, usually the sensor's MAC address.
    pub signifier: String,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// Variance of the average.
    pub average_var: f64,
    pub mean: f64,
    /// Number of raw samples the statistics were computed from.
    pub num: i64,
    /// Capture time reported by the device. `None` means "use ingestion time".
    #[serde(default)]
    pub captured_at: Option<Timestamp>,
}

impl Reading {
    /// Create an all-zero reading for the given device.
    pub fn new(signifier: impl Into<String>) -> Self {
        Self {
            signifier: signifier.into(),
            min: 0.0,
            max: 0.0,
            average: 0.0,
            average_var: 0.0,
            mean: 0.0,
            num: 0,
            captured_at: None,
        }
    }

    /// Set every summary statistic at once.
    pub fn with_stats(
        mut self,
        min: f64,
        max: f64,
        average: f64,
        average_var: f64,
        mean: f64,
        num: i64,
    ) -> Self {
        self.min = min;
        self.max = max;
        self.average = average;
        self.average_var = average_var;
        self.mean = mean;
        self.num = num;
        self
    }

    /// Set only the maximum, the one statistic alerting looks at.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = max;
        self
    }

    /// Attach an explicit capture timestamp.
    pub fn captured_at(mut self, ts: Timestamp) -> Self {
        self.captured_at = Some(ts);
        self
    }

    /// The capture time, or `ingested_at` when the device sent none.
    pub fn capture_time_or(&self, ingested_at: Timestamp) -> Timestamp {
        self.captured_at.unwrap_or(ingested_at)
    }
}
