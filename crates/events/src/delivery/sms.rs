//! SMS delivery through an HTTP GET gateway.
//!
//! [`SmsDelivery`] normalizes the target number, then issues a single GET to
//! the configured gateway with the key, sender, recipient, text and route
//! type as query parameters. There is no retry; the ledger records the
//! outcome.

use std::time::Duration;

use async_trait::async_trait;
use noisewatch_core::alert::STATUS_OK;
use noisewatch_core::phone::normalize_phone;

use super::{DeliveryError, DeliveryReceipt, Notifier};

/// Gateway endpoint used when `SMS_GATEWAY_URL` is not set.
pub const DEFAULT_GATEWAY_URL: &str = "https://www.smsflatrate.net/schnittstelle.php";

/// Sender id shown to recipients.
pub const DEFAULT_SENDER: &str = "opennoise";

/// Gateway route type.
pub const DEFAULT_ROUTE_TYPE: &str = "10";

/// HTTP request timeout for a single delivery attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response code the gateway uses for an accepted message.
const ACCEPTED_CODE: &str = "100";

// ---------------------------------------------------------------------------
// SmsConfig
// ---------------------------------------------------------------------------

/// Configuration for the SMS gateway.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Gateway API key. `None` turns every send into a recorded no-op.
    pub api_key: Option<String>,
    pub gateway_url: String,
    pub sender: String,
    pub route_type: String,
    pub timeout: Duration,
}

impl SmsConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Whether a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            sender: DEFAULT_SENDER.to_string(),
            route_type: DEFAULT_ROUTE_TYPE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// SmsDelivery
// ---------------------------------------------------------------------------

/// Sends alert messages as SMS.
pub struct SmsDelivery {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SmsDelivery {
    /// Create a delivery service with a pre-configured HTTP client.
    pub fn new(config: SmsConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SmsConfig {
        &self.config
    }
}

#[async_trait]
impl Notifier for SmsDelivery {
    async fn send(&self, message: &str, target: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(DeliveryError::MissingApiKey),
        };
        let to = normalize_phone(target)?;

        let response = self
            .client
            .get(&self.config.gateway_url)
            .query(&[
                ("key", key),
                ("from", self.config.sender.as_str()),
                ("to", to.as_str()),
                ("text", message),
                ("type", self.config.route_type.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await?;
        receipt_from_body(body.trim())
    }
}

/// Interpret a 2xx gateway body.
///
/// Numeric bodies are gateway result codes; anything but the accepted code
/// is a rejection. Other bodies are recorded verbatim.
fn receipt_from_body(body: &str) -> Result<DeliveryReceipt, DeliveryError> {
    if body.is_empty() {
        return Ok(DeliveryReceipt {
            status: STATUS_OK.to_string(),
        });
    }
    let is_code = body.chars().all(|c| c.is_ascii_digit());
    if is_code && body != ACCEPTED_CODE {
        return Err(DeliveryError::Rejected(body.to_string()));
    }
    Ok(DeliveryReceipt {
        status: body.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
