pub mod config;
pub mod types;

pub use config::{Cli, Commands, Config};
pub use types::{CaptureSettings, ConfigWarning, FileConfig, Mode, QuerySettings};
