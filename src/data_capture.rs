//! Capture side: one device feed streamed into one append-only session log.
//!
//! Components:
//! - `types`: telemetry events and session lifecycle types.
//! - `codec`: the single-line log encoding.
//! - `log_writer`: the append-only writer owned by a session.
//! - `shutdown`: the one-shot shutdown signal and its triggers.
//! - `capture_session`: connection, streaming and teardown.

pub mod capture_session;
pub mod codec;
pub mod log_writer;
pub mod shutdown;
pub mod types;

pub use capture_session::{run_capture, CaptureSession};
pub use log_writer::LogWriter;
pub use shutdown::ShutdownSignal;
pub use types::{CaptureSummary, SessionState, ShutdownReason, TelemetryEvent};
