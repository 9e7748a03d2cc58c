//! Device housekeeping telemetry.
//!
//! Sensors periodically report firmware and health information next to
//! their noise readings. The alerting path ignores these; they are persisted
//! for diagnostics.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Firmware telemetry kind, identified on the wire by a three-letter code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TelemetryKind {
    /// `esp`: ESP free heap.
    EspFreeHeap,
    /// `frt`: FreeRTOS free heap.
    FreeRtosFreeHeap,
    /// `flg`: telemetry flags (hex on the wire).
    Flags,
    /// `rst`: ESP reset reason.
    ResetReason,
    /// `ver`: application version.
    AppVersion,
    /// `prj`: project name.
    ProjectName,
    /// `tme`: compile time.
    CompileTime,
    /// `idf`: IDF version.
    IdfVersion,
    /// `chp`: chip revision info.
    ChipRevision,
    /// `esq`: extended signal quality.
    SignalQuality,
    /// Any code this build does not know about.
    Unknown(String),
}

/// Storage/handling category of a [`TelemetryKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryCategory {
    Memory,
    Version,
    Flag,
    ResetReason,
    SignalQuality,
    Misc,
}

impl TelemetryKind {
    /// Map a wire code to its kind. Never fails; unknown codes are kept.
    pub fn from_code(code: &str) -> Self {
        match code {
            "esp" => Self::EspFreeHeap,
            "frt" => Self::FreeRtosFreeHeap,
            "flg" => Self::Flags,
            "rst" => Self::ResetReason,
            "ver" => Self::AppVersion,
            "prj" => Self::ProjectName,
            "tme" => Self::CompileTime,
            "idf" => Self::IdfVersion,
            "chp" => Self::ChipRevision,
            "esq" => Self::SignalQuality,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire code.
    pub fn code(&self) -> &str {
        match self {
            Self::EspFreeHeap => "esp",
            Self::FreeRtosFreeHeap => "frt",
            Self::Flags => "flg",
            Self::ResetReason => "rst",
            Self::AppVersion => "ver",
            Self::ProjectName => "prj",
            Self::CompileTime => "tme",
            Self::IdfVersion => "idf",
            Self::ChipRevision => "chp",
            Self::SignalQuality => "esq",
            Self::Unknown(code) => code,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            Self::EspFreeHeap => "ESP free heap".into(),
            Self::FreeRtosFreeHeap => "FreeRTOS free heap".into(),
            Self::Flags => "Telemetry Flags".into(),
            Self::ResetReason => "ESP Reset reason".into(),
            Self::AppVersion => "App Version".into(),
            Self::ProjectName => "Project Name".into(),
            Self::CompileTime => "Compile time".into(),
            Self::IdfVersion => "IDF version".into(),
            Self::ChipRevision => "Chip revision info".into(),
            Self::SignalQuality => "extended signal quality".into(),
            Self::Unknown(code) => format!("unknown {code}"),
        }
    }

    pub fn category(&self) -> TelemetryCategory {
        match self {
            Self::EspFreeHeap | Self::FreeRtosFreeHeap => TelemetryCategory::Memory,
            Self::AppVersion | Self::ProjectName | Self::IdfVersion | Self::ChipRevision => {
                TelemetryCategory::Version
            }
            Self::Flags => TelemetryCategory::Flag,
            Self::ResetReason => TelemetryCategory::ResetReason,
            Self::SignalQuality => TelemetryCategory::SignalQuality,
            Self::CompileTime | Self::Unknown(_) => TelemetryCategory::Misc,
        }
    }

    /// Interpret a raw payload value for this kind.
    ///
    /// Memory and reset-reason values are decimal integers, flags are hex.
    /// Numbers that fail to parse are kept as text rather than dropped.
    pub fn parse_value(&self, raw: &str) -> TelemetryValue {
        let parsed = match self.category() {
            TelemetryCategory::Memory | TelemetryCategory::ResetReason => raw.parse::<i64>().ok(),
            TelemetryCategory::Flag => i64::from_str_radix(raw, 16).ok(),
            _ => return TelemetryValue::Text(raw.to_string()),
        };
        match parsed {
            Some(n) => TelemetryValue::Integer(n),
            None => TelemetryValue::Text(raw.to_string()),
        }
    }
}

impl From<String> for TelemetryKind {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<TelemetryKind> for String {
    fn from(kind: TelemetryKind) -> Self {
        kind.code().to_string()
    }
}

/// Decoded telemetry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Integer(i64),
    Text(String),
}

impl TelemetryValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Text form used for storage, regardless of variant.
    pub fn to_text(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One telemetry event from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub signifier: String,
    pub kind: TelemetryKind,
    pub value: TelemetryValue,
    #[serde(default)]
    pub captured_at: Option<Timestamp>,
}

impl Telemetry {
    pub fn new(signifier: impl Into<String>, kind: TelemetryKind, value: TelemetryValue) -> Self {
        Self {
            signifier: signifier.into(),
            kind,
            value,
            captured_at: None,
        }
    }

    pub fn captured_at(mut self, ts: Timestamp) -> Self {
        self.captured_at = Some(ts);
        self
    }
}
