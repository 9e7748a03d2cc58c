//! Per-device alerting policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Seconds;

/// Defaults applied to a freshly provisioned device.
pub const DEFAULT_THRESHOLD: f64 = 100.0;
pub const DEFAULT_DURATION_SECS: Seconds = 60;
pub const DEFAULT_COUNT: i64 = 3;
pub const DEFAULT_DEADTIME_SECS: Seconds = 1800;
pub const DEFAULT_DESCRIPTION: &str = "Unbekanntes Geraet";

/// Thresholds, timings and notification target for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePolicy {
    pub signifier: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// dB(A) level a reading's maximum must exceed to count as a violation.
    pub alert_threshold: f64,
    /// Look-back window for counting violations.
    pub alert_duration: Seconds,
    /// Minimum violations within the window before an alert fires.
    pub alert_count: i64,
    /// Minimum spacing between two fired alerts.
    pub alert_deadtime: Seconds,
    /// Notification target, normalized at send time.
    pub alert_phone: String,
    pub alert_active: bool,
    /// Epoch seconds at which an inactive policy becomes eligible again.
    pub turn_on_time: Seconds,
}

/// Where an inactive-or-active policy stands relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Active,
    /// Inactive with no scheduled turn-on.
    Disabled,
    /// Inactive until the given epoch second.
    Suspended { until: Seconds },
    /// Inactive, but the scheduled turn-on time has passed.
    Due,
}

impl DevicePolicy {
    /// A policy with the provisioning defaults. Inactive, no target.
    pub fn new(signifier: impl Into<String>) -> Self {
        Self {
            signifier: signifier.into(),
            description: DEFAULT_DESCRIPTION.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            alert_threshold: DEFAULT_THRESHOLD,
            alert_duration: DEFAULT_DURATION_SECS,
            alert_count: DEFAULT_COUNT,
            alert_deadtime: DEFAULT_DEADTIME_SECS,
            alert_phone: String::new(),
            alert_active: false,
            turn_on_time: 0,
        }
    }

    /// Check the structural invariants of the timing fields.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.alert_duration < 0 {
            return Err(CoreError::Validation(format!(
                "alert_duration must be >= 0, got {}",
                self.alert_duration
            )));
        }
        if self.alert_count < 1 {
            return Err(CoreError::Validation(format!(
                "alert_count must be >= 1, got {}",
                self.alert_count
            )));
        }
        if self.alert_deadtime < 0 {
            return Err(CoreError::Validation(format!(
                "alert_deadtime must be >= 0, got {}",
                self.alert_deadtime
            )));
        }
        if !self.alert_threshold.is_finite() {
            return Err(CoreError::Validation(
                "alert_threshold must be a finite number".into(),
            ));
        }
        Ok(())
    }

    /// Activation state at `now_secs` (epoch seconds).
    pub fn activation_at(&self, now_secs: Seconds) -> Activation {
        if self.alert_active {
            Activation::Active
        } else if self.turn_on_time <= 0 {
            Activation::Disabled
        } else if self.turn_on_time > now_secs {
            Activation::Suspended {
                until: self.turn_on_time,
            }
        } else {
            Activation::Due
        }
    }

    /// Description used in messages; falls back to the signifier when blank.
    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.signifier
        } else {
            &self.description
        }
    }
}
