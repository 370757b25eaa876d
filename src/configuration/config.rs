use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::storage::log_scanner::TimeWindow;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use log::{warn, LevelFilter};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface of the application.
///
/// Two subcommands share the global options: `capture` records one device feed into a new
/// session log, `query` decodes the session logs of a directory into tables.
///
/// # Examples
///
/// ```text
/// cst-logs capture 192.168.0.10 600 --log-dir /data/cst
/// cst-logs query sm 2018-06-14T00:00:00Z 2018-06-15T00:00:00Z --log-dir /data/cst
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "cst-logs")]
#[command(version)]
#[command(about = "Capture and query device telemetry session logs")]
pub struct Cli {
    /// Optional TOML configuration file
    ///
    /// Supplies defaults for the log directory, log level and timeouts. Values given on the
    /// command line win over the file.
    ///
    /// # Command Line
    /// Use `--config <FILE>` or the `CST_CONFIG` environment variable
    #[arg(long, global = true, env = "CST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application log level
    ///
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`. Defaults to `info`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Record the telemetry feed of one device into a new session log
    Capture {
        /// Device address, `host[:port]`, reached at `ws://<ADDRESS>`
        address: String,

        /// Stop after this many seconds; zero or negative captures until interrupted
        #[arg(allow_negative_numbers = true)]
        duration_secs: Option<i64>,

        /// Directory receiving the session log, created when missing
        #[arg(long, env = "CST_LOG_DIR")]
        log_dir: Option<PathBuf>,

        /// How long to wait for the device to accept the connection
        #[arg(long)]
        connect_timeout_ms: Option<u64>,

        /// How long to keep reading in-flight messages after asking the device to close
        #[arg(long)]
        drain_timeout_ms: Option<u64>,
    },

    /// Decode the events of one type from every session log of a directory
    Query {
        /// Message type tag, e.g. `fm`, `cc`, `hc` or `sm`
        message_type: String,

        /// Start of the time window, RFC 3339 (e.g. `2018-06-14T00:00:00Z`)
        #[arg(requires = "end")]
        start: Option<String>,

        /// End of the time window, RFC 3339
        end: Option<String>,

        /// Directory holding the session logs
        #[arg(long, env = "CST_LOG_DIR")]
        log_dir: Option<PathBuf>,
    },
}

/// Resolved runtime configuration.
///
/// Each value comes from the command line or environment first, then the configuration file,
/// then the built-in default.
///
/// Resolution runs before the logger is installed, so problems that do not stop the run are
/// kept in `warnings` for the caller to report once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub mode: Mode,
    pub warnings: Vec<ConfigWarning>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let log_level = parse_level(
            cli.log_level
                .as_deref()
                .or(file.log_level.as_deref()),
        )?;

        let mut warnings = Vec::new();
        let mode = match cli.command {
            Commands::Capture {
                address,
                duration_secs,
                log_dir,
                connect_timeout_ms,
                drain_timeout_ms,
            } => {
                if address.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "device address must not be empty".to_string(),
                    ));
                }
                Mode::Capture(CaptureSettings {
                    address,
                    log_dir: resolve_log_dir(log_dir, &file),
                    duration: capture_duration(duration_secs),
                    connect_timeout: positive_millis(
                        "connect_timeout_ms",
                        connect_timeout_ms
                            .or(file.connect_timeout_ms)
                            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
                    )?,
                    drain_timeout: positive_millis(
                        "drain_timeout_ms",
                        drain_timeout_ms
                            .or(file.drain_timeout_ms)
                            .unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS),
                    )?,
                })
            }
            Commands::Query {
                message_type,
                start,
                end,
                log_dir,
            } => Mode::Query(QuerySettings {
                log_dir: resolve_log_dir(log_dir, &file),
                message_type,
                window: time_window(start.as_deref(), end.as_deref(), &mut warnings),
            }),
        };

        Ok(Self {
            log_level,
            mode,
            warnings,
        })
    }

    /// Logs the warnings collected while resolving.
    pub fn report_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

fn resolve_log_dir(cli: Option<PathBuf>, file: &FileConfig) -> PathBuf {
    cli.or_else(|| file.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

fn parse_level(level: Option<&str>) -> Result<LevelFilter, ConfigError> {
    match level {
        None => Ok(DEFAULT_LOG_LEVEL),
        Some(text) => text
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown log level '{}'", text))),
    }
}

fn positive_millis(name: &str, millis: u64) -> Result<Duration, ConfigError> {
    if millis == 0 {
        return Err(ConfigError::InvalidValue(format!("{} must be positive", name)));
    }
    Ok(Duration::from_millis(millis))
}

fn capture_duration(secs: Option<i64>) -> Option<Duration> {
    match secs {
        Some(secs) if secs > 0 => Some(Duration::from_secs(secs.unsigned_abs())),
        _ => None,
    }
}

/// Window from optional RFC 3339 bounds; a bound that does not parse is left open.
pub fn time_window(
    start: Option<&str>,
    end: Option<&str>,
    warnings: &mut Vec<ConfigWarning>,
) -> TimeWindow {
    let default = TimeWindow::default();
    let mut bound = |text: Option<&str>, open: i64| match text.map(parse_instant) {
        Some(Ok(millis)) => millis,
        Some(Err(e)) => {
            warnings.push(e);
            open
        }
        None => open,
    };
    let window = TimeWindow::new(
        bound(start, default.start_millis),
        bound(end, default.end_millis),
    );
    if window.start_millis > window.end_millis {
        warnings.push(ConfigWarning::EmptyWindow);
    }
    window
}

/// Epoch milliseconds of an RFC 3339 instant.
pub fn parse_instant(text: &str) -> Result<i64, ConfigWarning> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|instant| instant.timestamp_millis())
        .map_err(|e| ConfigWarning::InvalidInstant {
            text: text.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    fn resolve(args: &[&str], file: FileConfig) -> Config {
        Config::resolve(parse(args).unwrap_or_else(|e| panic!("{}", e)), file).unwrap()
    }

    #[test]
    fn test_capture_defaults() {
        let config = resolve(&["cst-logs", "capture", "10.0.0.5"], FileConfig::default());

        assert_eq!(config.log_level, LevelFilter::Info);
        assert!(config.warnings.is_empty());
        assert_eq!(
            config.mode,
            Mode::Capture(CaptureSettings {
                address: "10.0.0.5".to_string(),
                log_dir: PathBuf::from("cst-logs"),
                duration: None,
                connect_timeout: Duration::from_millis(5000),
                drain_timeout: Duration::from_millis(1000),
            })
        );
    }

    #[test]
    fn test_capture_duration_sign() {
        let with = |secs: &str| match resolve(&["cst-logs", "capture", "dev", secs], FileConfig::default()).mode {
            Mode::Capture(settings) => settings.duration,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(with("30"), Some(Duration::from_secs(30)));
        assert_eq!(with("0"), None);
        assert_eq!(with("-5"), None);
    }

    #[test]
    fn test_cli_overrides_file_overrides_defaults() {
        let file = FileConfig::from_toml_str(
            r#"
            log_dir = "/from/file"
            log_level = "debug"
            connect_timeout_ms = 3000
            "#,
        )
        .unwrap();

        let config = resolve(
            &["cst-logs", "capture", "dev", "--log-dir", "/from/cli", "--drain-timeout-ms", "250"],
            file,
        );
        assert_eq!(config.log_level, LevelFilter::Debug);
        let Mode::Capture(settings) = config.mode else {
            panic!("expected capture mode");
        };
        assert_eq!(settings.log_dir, PathBuf::from("/from/cli"));
        assert_eq!(settings.connect_timeout, Duration::from_millis(3000));
        assert_eq!(settings.drain_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_query_window() {
        let config = resolve(
            &["cst-logs", "query", "sm", "1970-01-01T00:00:01Z", "1970-01-01T00:00:02.5Z"],
            FileConfig::default(),
        );
        let Mode::Query(settings) = config.mode else {
            panic!("expected query mode");
        };
        assert_eq!(settings.message_type, "sm");
        assert_eq!(settings.window, TimeWindow::new(1000, 2500));

        let config = resolve(&["cst-logs", "query", "fm"], FileConfig::default());
        let Mode::Query(settings) = config.mode else {
            panic!("expected query mode");
        };
        assert_eq!(settings.window, TimeWindow::default());
    }

    #[test]
    fn test_query_bounds_come_in_pairs() {
        assert!(parse(&["cst-logs", "query", "fm", "1970-01-01T00:00:01Z"]).is_err());
        assert!(parse(&["cst-logs", "query"]).is_err());
        assert!(parse(&["cst-logs"]).is_err());
    }

    #[test]
    fn test_invalid_bound_is_left_open() {
        let mut warnings = Vec::new();
        let window = time_window(Some("yesterday"), Some("1970-01-01T00:00:01+00:00"), &mut warnings);
        assert_eq!(window, TimeWindow::new(0, 1000));
        assert!(matches!(
            &warnings[..],
            [ConfigWarning::InvalidInstant { text, .. }] if text == "yesterday"
        ));
    }

    #[test]
    fn test_window_problems_are_kept_for_reporting() {
        let config = resolve(
            &["cst-logs", "query", "fm", "yesterday", "1970-01-01T00:00:05Z"],
            FileConfig::default(),
        );
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0]
            .to_string()
            .starts_with("Ignoring invalid instant 'yesterday'"));

        let config = resolve(
            &["cst-logs", "query", "fm", "1970-01-01T00:00:09Z", "1970-01-01T00:00:05Z"],
            FileConfig::default(),
        );
        assert_eq!(config.warnings, vec![ConfigWarning::EmptyWindow]);
        let Mode::Query(settings) = config.mode else {
            panic!("expected query mode");
        };
        assert_eq!(settings.window, TimeWindow::new(9000, 5000));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cli = parse(&["cst-logs", "--log-level", "loud", "query", "fm"]).unwrap();
        assert!(matches!(
            Config::resolve(cli, FileConfig::default()),
            Err(ConfigError::InvalidValue(_))
        ));

        let cli = parse(&["cst-logs", "capture", "dev", "--connect-timeout-ms", "0"]).unwrap();
        assert!(matches!(
            Config::resolve(cli, FileConfig::default()),
            Err(ConfigError::InvalidValue(_))
        ));

        assert!(matches!(
            FileConfig::from_toml_str("log_dirr = \"x\""),
            Err(ConfigError::TomlError(_))
        ));
    }
}
