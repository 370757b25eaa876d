//! Storage subsystem
//!
//! Everything that touches session log files on disk after capture.
//!
//! Components:
//! - `file_storage`: session file naming, log directory preparation and listing.
//! - `log_scanner`: time-windowed, type-filtered scan of one session log.

pub mod file_storage;
pub mod log_scanner;

pub use file_storage::{parse_session_file_name, LogSession};
pub use log_scanner::{LogScanner, ScanStats, TimeWindow};
