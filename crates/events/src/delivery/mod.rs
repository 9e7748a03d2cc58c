//! External notification channels.
//!
//! A [`Notifier`] turns a rendered alert message and a policy target into a
//! [`DeliveryReceipt`] or a [`DeliveryError`]. Both sides end up as the
//! status text of the alert's ledger row.

use std::time::Duration;

use async_trait::async_trait;
use noisewatch_core::alert::STATUS_NO_API_KEY;
use noisewatch_core::error::CoreError;

pub mod sms;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No API key configured; nothing was sent.
    #[error("{}", STATUS_NO_API_KEY)]
    MissingApiKey,

    /// The policy target is not a phone number the gateway accepts.
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] CoreError),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("SMS gateway returned HTTP {0}")]
    HttpStatus(u16),

    /// The gateway answered 2xx but refused the message.
    #[error("SMS gateway rejected message: {0}")]
    Rejected(String),

    #[error("delivery timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Successful hand-off to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Status text recorded in the ledger.
    pub status: String,
}

/// A channel that can deliver an alert message to a target.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, target: &str) -> Result<DeliveryReceipt, DeliveryError>;
}
