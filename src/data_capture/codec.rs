//! Line encoding of telemetry events.
//!
//! One event is one line: `<timestamp millis>,<raw payload>`. Only the first
//! comma separates the two parts; the payload keeps any commas it contains.

use crate::error_handling::types::CodecError;

use super::types::TelemetryEvent;

const SEPARATOR: char = ',';

/// Encodes an event without a line terminator.
///
/// The payload must not contain `\n`; this is not checked.
pub fn encode(event: &TelemetryEvent) -> String {
    format!(
        "{}{}{}",
        event.timestamp_millis(),
        SEPARATOR,
        event.raw_payload()
    )
}

/// Decodes one log line back into an event.
pub fn decode(line: &str) -> Result<TelemetryEvent, CodecError> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let (timestamp, payload) = line
        .split_once(SEPARATOR)
        .ok_or_else(|| CodecError::MissingSeparator(line.to_string()))?;

    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|_| CodecError::InvalidTimestamp(line.to_string()))?;

    Ok(TelemetryEvent::new(timestamp, payload))
}
