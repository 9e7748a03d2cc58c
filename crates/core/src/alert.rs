//! Alert records and message rendering.

use serde::{Deserialize, Serialize};

use crate::policy::DevicePolicy;
use crate::types::Timestamp;

/// Status of a ledger row whose delivery has not completed yet.
pub const STATUS_PENDING: &str = "not sent yet";

/// Status recorded when the gateway accepted a message without a body.
pub const STATUS_OK: &str = "OK";

/// Status recorded when no SMS API key is configured.
pub const STATUS_NO_API_KEY: &str = "not sent, no sms key";

/// Placeholder substituted with the device description.
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Lautstaerkeueberschreitung an Strassenmusik-Messgeraet {description}";

/// One notification attempt for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub signifier: String,
    pub fired_at: Timestamp,
    /// Notification target as configured in the policy.
    pub target: String,
    pub message: String,
    pub status: String,
}

impl Alert {
    /// A freshly fired alert whose delivery outcome is still unknown.
    pub fn pending(policy: &DevicePolicy, fired_at: Timestamp, message: String) -> Self {
        Self {
            signifier: policy.signifier.clone(),
            fired_at,
            target: policy.alert_phone.clone(),
            message,
            status: STATUS_PENDING.to_string(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}

/// Render an alert message for `policy` from `template`.
///
/// Every occurrence of `{description}` is replaced with the policy's
/// description, or its signifier when the description is blank.
pub fn render_message(template: &str, policy: &DevicePolicy) -> String {
    template.replace(DESCRIPTION_PLACEHOLDER, policy.display_name())
}
