use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// A log line that could not be turned back into a telemetry event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    MissingSeparator(String),
    InvalidTimestamp(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MissingSeparator(line) => {
                write!(f, "Malformed log line (no timestamp separator): {}", line)
            }
            CodecError::InvalidTimestamp(line) => {
                write!(f, "Malformed log line (invalid timestamp): {}", line)
            }
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    InvalidJson(String),
    NotAnObject,
    MissingKey {
        tag: &'static str,
        key: &'static str,
    },
    UnexpectedType {
        key: &'static str,
        expected: &'static str,
    },
    ShortRow {
        key: &'static str,
        row: usize,
        len: usize,
        width: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson(e) => write!(f, "Payload is not valid JSON: {}", e),
            DecodeError::NotAnObject => write!(f, "Payload is not a JSON object"),
            DecodeError::MissingKey { tag, key } => {
                write!(f, "Missing key '{}' in '{}' payload", key, tag)
            }
            DecodeError::UnexpectedType { key, expected } => {
                write!(f, "Key '{}' does not hold {}", key, expected)
            }
            DecodeError::ShortRow {
                key,
                row,
                len,
                width,
            } => write!(
                f,
                "Row {} of '{}' has {} value(s), expected at least {}",
                row, key, len, width
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub enum StorageError {
    DirectoryUnusable(PathBuf),
    AlreadyExists(PathBuf),
    Io(std::io::Error),
    Closed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DirectoryUnusable(p) => {
                write!(f, "Log directory is not usable: {}", p.display())
            }
            StorageError::AlreadyExists(p) => {
                write!(f, "Refusing to overwrite existing log file: {}", p.display())
            }
            StorageError::Io(e) => write!(f, "Storage IO error: {}", e),
            StorageError::Closed => write!(f, "Log writer is already closed"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    ConnectionFailed(String),
    ConnectionTimeout(Duration),
    Storage(StorageError),
    Send(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ConnectionFailed(e) => write!(f, "Connection failed: {}", e),
            CaptureError::ConnectionTimeout(d) => {
                write!(f, "Connection timed out after {} ms", d.as_millis())
            }
            CaptureError::Storage(e) => write!(f, "Capture storage error: {}", e),
            CaptureError::Send(e) => write!(f, "Failed to send control message: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::Storage(err)
    }
}

#[derive(Debug)]
pub enum QueryError {
    MissingLogFile(PathBuf),
    DirectoryUnreadable(PathBuf, std::io::Error),
    Io(std::io::Error),
    Render(std::io::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::MissingLogFile(p) => {
                write!(f, "Log file does not exist: {}", p.display())
            }
            QueryError::DirectoryUnreadable(p, e) => {
                write!(f, "Failed to list log directory {}: {}", p.display(), e)
            }
            QueryError::Io(e) => write!(f, "Query IO error: {}", e),
            QueryError::Render(e) => write!(f, "Failed to render results: {}", e),
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub enum ApplicationError {
    Config(ConfigError),
    Storage(StorageError),
    Capture(CaptureError),
    Query(QueryError),
}

impl ApplicationError {
    /// Process exit status for a failure that ends the program.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApplicationError::Config(_) => 1,
            ApplicationError::Storage(StorageError::AlreadyExists(_)) => 3,
            ApplicationError::Storage(_) => 2,
            ApplicationError::Capture(CaptureError::Storage(StorageError::AlreadyExists(_))) => 3,
            ApplicationError::Capture(CaptureError::Storage(_)) => 2,
            ApplicationError::Capture(_) => 4,
            ApplicationError::Query(QueryError::Render(_)) => 5,
            ApplicationError::Query(_) => 2,
        }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Config(e) => write!(f, "Configuration error: {}", e),
            ApplicationError::Storage(e) => write!(f, "Storage error: {}", e),
            ApplicationError::Capture(e) => write!(f, "Capture error: {}", e),
            ApplicationError::Query(e) => write!(f, "Query error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {}

impl From<ConfigError> for ApplicationError {
    fn from(err: ConfigError) -> Self {
        ApplicationError::Config(err)
    }
}

impl From<StorageError> for ApplicationError {
    fn from(err: StorageError) -> Self {
        ApplicationError::Storage(err)
    }
}

impl From<CaptureError> for ApplicationError {
    fn from(err: CaptureError) -> Self {
        ApplicationError::Capture(err)
    }
}

impl From<QueryError> for ApplicationError {
    fn from(err: QueryError) -> Self {
        ApplicationError::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        let exists = ApplicationError::Capture(CaptureError::Storage(StorageError::AlreadyExists(
            PathBuf::from("x.log"),
        )));
        let connect = ApplicationError::Capture(CaptureError::ConnectionTimeout(
            Duration::from_millis(5000),
        ));
        let missing = ApplicationError::Query(QueryError::MissingLogFile(PathBuf::from("y.log")));

        assert_eq!(exists.exit_code(), 3);
        assert_eq!(connect.exit_code(), 4);
        assert_eq!(missing.exit_code(), 2);
        assert_ne!(exists.exit_code(), connect.exit_code());
    }

    #[test]
    fn test_display_is_single_line() {
        let err = CodecError::InvalidTimestamp("abc,{}".into());
        let text = err.to_string();
        assert!(!text.contains('\n'));
        assert!(text.contains("abc,{}"));
    }
}
