//! Newline-delimited JSON ingestion.
//!
//! Each line is one object tagged by `type`:
//!
//! ```json
//! {"type":"reading","signifier":"c4:dd:57:66:95:60","min":40.1,"max":81.5,"average":55.0,"average_var":3.2,"mean":54.0,"num":120}
//! {"type":"telemetry","signifier":"c4:dd:57:66:95:60","kind":"flg","value":"1f"}
//! ```
//!
//! Blank lines are ignored. Malformed lines are logged and skipped.
//! Publishing waits while an observer's queue is full, so a slow consumer
//! slows down reading from the input rather than losing events.

use noisewatch_core::reading::Reading;
use noisewatch_core::telemetry::{Telemetry, TelemetryValue};
use noisewatch_events::{DistributorError, EventDistributor};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

/// One decoded input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IngestMessage {
    Reading(Reading),
    Telemetry(Telemetry),
}

/// Counters reported when ingestion stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    /// Events handed to at least one observer.
    pub published: u64,
    pub malformed: u64,
    /// Events no observer was registered to receive.
    pub undelivered: u64,
}

/// Decode one line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<IngestMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message = match serde_json::from_str(line)? {
        IngestMessage::Telemetry(mut telemetry) => {
            // Devices send every payload as a string; decode by kind.
            if let TelemetryValue::Text(raw) = &telemetry.value {
                telemetry.value = telemetry.kind.parse_value(raw);
            }
            IngestMessage::Telemetry(telemetry)
        }
        reading => reading,
    };
    Ok(Some(message))
}

/// Read lines from `reader` and publish them until EOF, a read error, the
/// distributor closing, or `cancel`.
pub async fn run<R>(
    reader: R,
    distributor: &EventDistributor,
    cancel: CancellationToken,
) -> IngestStats
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = IngestStats::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Ingestion cancelled");
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("Input closed");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };
        stats.lines += 1;

        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(error = %e, line = stats.lines, "Skipping malformed input line");
                continue;
            }
        };

        let published = match message {
            IngestMessage::Reading(reading) => distributor.publish(reading).await,
            IngestMessage::Telemetry(telemetry) => distributor.publish_telemetry(telemetry).await,
        };
        match published {
            Ok(0) => {
                stats.undelivered += 1;
                tracing::warn!(line = stats.lines, "No observers registered, event discarded");
            }
            Ok(_) => stats.published += 1,
            Err(DistributorError::Closed) => {
                tracing::warn!("Event distributor closed, stopping ingestion");
                break;
            }
            Err(e) => tracing::error!(error = %e, "Failed to publish event"),
        }
    }

    tracing::info!(
        lines = stats.lines,
        published = stats.published,
        malformed = stats.malformed,
        undelivered = stats.undelivered,
        "Ingestion stopped"
    );
    stats
}
