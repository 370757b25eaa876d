//! Common data types used across the data_capture subsystem.

use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use log::error;
use serde_json::{Map, Value};

use crate::error_handling::types::DecodeError;

/// One captured telemetry message paired with its receipt time.
///
/// The raw payload stays an opaque string until something asks for its
/// structure. The first call to [`TelemetryEvent::payload`] parses it and
/// memoizes the outcome, including a failure: an event whose payload could
/// not be parsed once is never parsed again.
#[derive(Clone)]
pub struct TelemetryEvent {
    timestamp_millis: i64,
    raw_payload: String,
    decoded: OnceCell<Option<Map<String, Value>>>,
}

impl TelemetryEvent {
    pub fn new(timestamp_millis: i64, raw_payload: impl Into<String>) -> Self {
        Self {
            timestamp_millis,
            raw_payload: raw_payload.into(),
            decoded: OnceCell::new(),
        }
    }

    /// Builds an event stamped with the current wall-clock time.
    pub fn received_now(raw_payload: impl Into<String>) -> Self {
        Self::new(Utc::now().timestamp_millis(), raw_payload)
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    pub fn is_before(&self, millis: i64) -> bool {
        self.timestamp_millis < millis
    }

    pub fn is_after(&self, millis: i64) -> bool {
        self.timestamp_millis > millis
    }

    /// Decoded payload object, parsed on first use.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.decoded
            .get_or_init(|| match parse_payload(&self.raw_payload) {
                Ok(map) => Some(map),
                Err(e) => {
                    error!("Failed to decode payload: {}", e);
                    None
                }
            })
            .as_ref()
    }

    /// Whether the payload carries the given message type tag as a top-level key.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.payload().is_some_and(|map| map.contains_key(tag))
    }
}

fn parse_payload(raw: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::NotAnObject),
        Err(e) => Err(DecodeError::InvalidJson(e.to_string())),
    }
}

impl PartialEq for TelemetryEvent {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_millis == other.timestamp_millis && self.raw_payload == other.raw_payload
    }
}

impl Eq for TelemetryEvent {}

impl fmt::Debug for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TelemetryEvent(timestamp={}, payload={})",
            self.timestamp_millis, self.raw_payload
        )
    }
}

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closing,
    Closed,
}

/// What caused a capture session to leave the streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C from the operator.
    Interrupt,
    /// SIGTERM from the host.
    Terminate,
    /// The configured capture duration elapsed.
    Deadline,
    /// The device closed the connection.
    RemoteClosed,
    /// The connection failed mid-stream.
    ConnectionLost,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
            ShutdownReason::Deadline => "capture duration elapsed",
            ShutdownReason::RemoteClosed => "remote closed connection",
            ShutdownReason::ConnectionLost => "connection lost",
        };
        f.write_str(text)
    }
}

/// Outcome of a finished capture session.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub events_written: u64,
    pub write_failures: u64,
    pub reason: ShutdownReason,
}
