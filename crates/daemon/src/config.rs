//! Daemon configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use noisewatch_alerting::{AlertEngineConfig, EvaluationTime};
use noisewatch_core::alert::DEFAULT_MESSAGE_TEMPLATE;
use noisewatch_events::bus::DEFAULT_CAPACITY;
use noisewatch_events::delivery::sms::{
    DEFAULT_GATEWAY_URL, DEFAULT_ROUTE_TYPE, DEFAULT_SENDER, DEFAULT_TIMEOUT,
};
use noisewatch_events::SmsConfig;

use crate::logging::LogFormat;

const DEFAULT_DATABASE_URL: &str = "sqlite://noisewatch.db?mode=rwc";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the daemon needs to start.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub sms: SmsConfig,
    pub engine: AlertEngineConfig,
    pub event_bus_capacity: usize,
    /// Readings older than this are purged. `None` keeps them forever.
    pub reading_retention: Option<Duration>,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default                                          |
    /// |--------------------------|--------------------------------------------------|
    /// | `DATABASE_URL`           | `sqlite://noisewatch.db?mode=rwc`                |
    /// | `DB_MAX_CONNECTIONS`     | `5`                                              |
    /// | `SMS_API_KEY`            | unset (alerts are recorded as not sent)          |
    /// | `SMS_GATEWAY_URL`        | `https://www.smsflatrate.net/schnittstelle.php`  |
    /// | `SMS_SENDER`             | `opennoise`                                      |
    /// | `SMS_ROUTE_TYPE`         | `10`                                             |
    /// | `NOTIFY_TIMEOUT_SECS`    | `10`                                             |
    /// | `ALERT_MESSAGE_TEMPLATE` | `Lautstaerkeueberschreitung an Strassenmusik-Messgeraet {description}` |
    /// | `ALERT_EVALUATION_TIME`  | `now` (or `reading`)                             |
    /// | `ALERT_AUTO_ACTIVATE`    | `false`                                          |
    /// | `EVENT_BUS_CAPACITY`     | `1024`                                           |
    /// | `READING_RETENTION_DAYS` | `0` (keep forever)                               |
    /// | `LOG_FORMAT`             | `text` (or `json`)                               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let notify_timeout_secs: u64 = parse_or(
            "NOTIFY_TIMEOUT_SECS",
            var("NOTIFY_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT.as_secs(),
        )?;
        if notify_timeout_secs == 0 {
            return Err(invalid("NOTIFY_TIMEOUT_SECS", "0", "must be at least 1"));
        }

        let sms = SmsConfig {
            api_key: var("SMS_API_KEY"),
            gateway_url: var("SMS_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.into()),
            sender: var("SMS_SENDER").unwrap_or_else(|| DEFAULT_SENDER.into()),
            route_type: var("SMS_ROUTE_TYPE").unwrap_or_else(|| DEFAULT_ROUTE_TYPE.into()),
            timeout: Duration::from_secs(notify_timeout_secs),
        };

        let engine = AlertEngineConfig {
            message_template: lookup("ALERT_MESSAGE_TEMPLATE")
                .unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.into()),
            evaluation_time: parse_or(
                "ALERT_EVALUATION_TIME",
                var("ALERT_EVALUATION_TIME"),
                EvaluationTime::Now,
            )?,
            auto_activate: parse_bool("ALERT_AUTO_ACTIVATE", var("ALERT_AUTO_ACTIVATE"))?,
        };

        let retention_raw = var("READING_RETENTION_DAYS");
        let retention_days: u64 =
            parse_or("READING_RETENTION_DAYS", retention_raw.clone(), 0)?;
        let reading_retention = match retention_days {
            0 => None,
            days => {
                let secs = days.checked_mul(SECS_PER_DAY).ok_or_else(|| {
                    invalid(
                        "READING_RETENTION_DAYS",
                        retention_raw.as_deref().unwrap_or_default(),
                        "retention period is too large",
                    )
                })?;
                Some(Duration::from_secs(secs))
            }
        };

        let event_bus_capacity: usize =
            parse_or("EVENT_BUS_CAPACITY", var("EVENT_BUS_CAPACITY"), DEFAULT_CAPACITY)?;
        if event_bus_capacity == 0 {
            return Err(invalid("EVENT_BUS_CAPACITY", "0", "must be at least 1"));
        }

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            sms,
            engine,
            event_bus_capacity,
            reading_retention,
            log_format: parse_or("LOG_FORMAT", var("LOG_FORMAT"), LogFormat::Text)?,
        })
    }

    /// Database URL with any password masked, for logs.
    pub fn redacted_database_url(&self) -> String {
        match self.database_url.split_once('@') {
            Some((_, host)) => format!("***@{host}"),
            None => self.database_url.clone(),
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, &value, e.to_string())),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(var, &v, "expected true or false")),
        },
    }
}
