//! Pure decision gates for a single alert evaluation.
//!
//! A decision pass runs the gates in order and stops at the first one that
//! returns a skip. The gates themselves never touch storage; the caller loads
//! the policy, last alert and exceedance count between them so that cheap
//! gates short-circuit before expensive queries.

use std::fmt;

use crate::policy::{Activation, DevicePolicy};
use crate::types::{from_epoch, Timestamp};

/// Outcome of a decision pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Inactive with no scheduled turn-on.
    Disabled,
    /// Inactive until the given epoch second.
    Suspended { until: i64 },
    /// The reading's maximum is below the policy threshold.
    BelowThreshold { max: f64, threshold: f64 },
    /// Still inside the dead time of the previous alert.
    DeadTime { until: Timestamp },
    /// Not enough violations inside the window.
    InsufficientEvidence { count: i64, required: i64 },
    /// All gates passed.
    Fire { count: i64 },
}

impl Decision {
    pub fn is_fire(&self) -> bool {
        matches!(self, Self::Fire { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "alerting disabled"),
            Self::Suspended { until } => write!(f, "suspended until {until}"),
            Self::BelowThreshold { max, threshold } => {
                write!(f, "max {max} below threshold {threshold}")
            }
            Self::DeadTime { until } => write!(f, "in dead time until {until}"),
            Self::InsufficientEvidence { count, required } => {
                write!(f, "{count} of {required} required violations")
            }
            Self::Fire { count } => write!(f, "fire after {count} violations"),
        }
    }
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// Gate 1: activation.
///
/// Returns [`Activation::Active`] or [`Activation::Due`] when the pass may
/// proceed. `Due` tells the caller the policy's turn-on time has passed while
/// the active flag is still off.
pub fn activation_gate(policy: &DevicePolicy, now: Timestamp) -> Result<Activation, Decision> {
    match policy.activation_at(now.timestamp()) {
        Activation::Disabled => Err(Decision::Disabled),
        Activation::Suspended { until } => Err(Decision::Suspended { until }),
        proceed => Ok(proceed),
    }
}

/// Gate 2: the reading itself. A maximum exactly at the threshold passes.
pub fn threshold_gate(policy: &DevicePolicy, reading_max: f64) -> Result<(), Decision> {
    if reading_max < policy.alert_threshold {
        return Err(Decision::BelowThreshold {
            max: reading_max,
            threshold: policy.alert_threshold,
        });
    }
    Ok(())
}

/// Gate 3: dead time. Exclusive: at exactly `last + deadtime` the pass
/// proceeds. No previous alert means no dead time.
pub fn deadtime_gate(
    policy: &DevicePolicy,
    last_fired: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), Decision> {
    let Some(last) = last_fired else {
        return Ok(());
    };
    let until = last.timestamp().saturating_add(policy.alert_deadtime);
    if until > now.timestamp() {
        return Err(Decision::DeadTime {
            until: from_epoch(until),
        });
    }
    Ok(())
}

/// Gate 4: evidence. Produces the final decision.
pub fn evidence_gate(policy: &DevicePolicy, count: i64) -> Decision {
    if count < policy.alert_count {
        Decision::InsufficientEvidence {
            count,
            required: policy.alert_count,
        }
    } else {
        Decision::Fire { count }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn active_policy() -> DevicePolicy {
        DevicePolicy {
            alert_active: true,
            alert_threshold: 2.0,
            alert_duration: 10,
            alert_count: 5,
            alert_deadtime: 1800,
            ..DevicePolicy::new("dev")
        }
    }

    // -- activation --------------------------------------------------------

    #[test]
    fn active_policy_proceeds() {
        assert_eq!(
            activation_gate(&active_policy(), at(100)),
            Ok(Activation::Active)
        );
    }

    #[test]
    fn inactive_without_turn_on_is_disabled() {
        let p = DevicePolicy {
            alert_active: false,
            turn_on_time: 0,
            ..active_policy()
        };
        assert_eq!(activation_gate(&p, at(100)), Err(Decision::Disabled));
    }

    #[test]
    fn inactive_with_future_turn_on_is_suspended() {
        let p = DevicePolicy {
            alert_active: false,
            turn_on_time: 500,
            ..active_policy()
        };
        assert_eq!(
            activation_gate(&p, at(100)),
            Err(Decision::Suspended { until: 500 })
        );
    }

    #[test]
    fn inactive_with_past_turn_on_is_due() {
        let p = DevicePolicy {
            alert_active: false,
            turn_on_time: 50,
            ..active_policy()
        };
        assert_eq!(activation_gate(&p, at(100)), Ok(Activation::Due));
    }

    // -- threshold ---------------------------------------------------------

    #[test]
    fn below_threshold_stops() {
        assert_matches!(
            threshold_gate(&active_policy(), 1.99),
            Err(Decision::BelowThreshold { .. })
        );
    }

    #[test]
    fn exactly_at_threshold_passes() {
        assert_eq!(threshold_gate(&active_policy(), 2.0), Ok(()));
        assert_eq!(threshold_gate(&active_policy(), 2.5), Ok(()));
    }

    // -- dead time ---------------------------------------------------------

    #[test]
    fn no_previous_alert_means_no_dead_time() {
        assert_eq!(deadtime_gate(&active_policy(), None, at(0)), Ok(()));
    }

    #[test]
    fn inside_dead_time_stops() {
        assert_eq!(
            deadtime_gate(&active_policy(), Some(at(1000)), at(2799)),
            Err(Decision::DeadTime { until: at(2800) })
        );
    }

    #[test]
    fn dead_time_is_exclusive() {
        assert_eq!(deadtime_gate(&active_policy(), Some(at(1000)), at(2800)), Ok(()));
    }

    #[test]
    fn zero_dead_time_never_blocks() {
        let p = DevicePolicy {
            alert_deadtime: 0,
            ..active_policy()
        };
        assert_eq!(deadtime_gate(&p, Some(at(1000)), at(1000)), Ok(()));
    }

    // -- evidence ----------------------------------------------------------

    #[test]
    fn evidence_requires_alert_count() {
        assert_eq!(
            evidence_gate(&active_policy(), 4),
            Decision::InsufficientEvidence {
                count: 4,
                required: 5
            }
        );
        assert!(evidence_gate(&active_policy(), 5).is_fire());
        assert!(evidence_gate(&active_policy(), 9).is_fire());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            Decision::InsufficientEvidence {
                count: 2,
                required: 3
            }
            .to_string(),
            "2 of 3 required violations"
        );
        assert_eq!(Decision::Disabled.to_string(), "alerting disabled");
    }
}
