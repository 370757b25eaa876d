use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime};
use log::{debug, error, info};
use regex::Regex;

use crate::error_handling::types::{QueryError, StorageError};

pub const LOG_FILE_EXTENSION: &str = "log";
const FILE_NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One capture run as recorded in a log file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSession {
    pub address: String,
    /// Local wall-clock time at which the session started.
    pub started: NaiveDateTime,
    pub file_name: String,
}

/// `<address>_<yyyyMMdd_HHmmss>.log`
pub fn session_file_name(address: &str, started: DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        address,
        started.format(FILE_NAME_TIME_FORMAT),
        LOG_FILE_EXTENSION
    )
}

static FILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)_(\d{8}_\d{6})\.log$").unwrap());

/// Recovers address and start time from a session log file name.
///
/// Returns `None` for names that do not follow the session convention.
pub fn parse_session_file_name(name: &str) -> Option<LogSession> {
    let captures = FILE_NAME_RE.captures(name)?;
    let address = captures.get(1)?.as_str().to_string();
    let started =
        NaiveDateTime::parse_from_str(captures.get(2)?.as_str(), FILE_NAME_TIME_FORMAT).ok()?;
    Some(LogSession {
        address,
        started,
        file_name: name.to_string(),
    })
}

pub fn prepare_log_directory(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        debug!("Using existing log directory {}", path.display());
        return Ok(());
    }
    if path.exists() {
        error!("{} exists and is not a directory", path.display());
        return Err(StorageError::DirectoryUnusable(path.to_path_buf()));
    }

    fs::create_dir_all(path).map_err(|e| {
        error!("Failed to create log directory {}: {}", path.display(), e);
        StorageError::DirectoryUnusable(path.to_path_buf())
    })?;
    info!("Created log directory {}", path.display());
    Ok(())
}

/// Regular files with a `.log` extension (any case), sorted by name.
pub fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>, QueryError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        error!("Failed to read log directory {}: {}", dir.display(), e);
        QueryError::DirectoryUnreadable(dir.to_path_buf(), e)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            error!("Dir entry error in {}: {}", dir.display(), e);
            QueryError::DirectoryUnreadable(dir.to_path_buf(), e)
        })?;
        let path = entry.path();
        let is_log = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LOG_FILE_EXTENSION));
        if is_log && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} log file(s) in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .unwrap()
    }

    #[test]
    fn test_session_file_name_format() {
        let name = session_file_name("192.168.1.20", at(2024, 3, 7, 9, 5, 1));
        assert_eq!(name, "192.168.1.20_20240307_090501.log");
    }

    #[test]
    fn test_parse_session_file_name() {
        let session = parse_session_file_name("10.0.0.5:8080_20231231_235959.log").unwrap();
        assert_eq!(session.address, "10.0.0.5:8080");
        assert_eq!(
            session.started,
            NaiveDate::from_ymd_opt(2023, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );

        // the address may itself contain underscores
        let session = parse_session_file_name("dev_a_20240101_000000.log").unwrap();
        assert_eq!(session.address, "dev_a");

        assert!(parse_session_file_name("notes.log").is_none());
        assert!(parse_session_file_name("dev_20241301_000000.log").is_none());
        assert!(parse_session_file_name("dev_20240101_000000.txt").is_none());
    }

    #[test]
    fn test_name_roundtrip() {
        let started = at(2022, 6, 15, 14, 30, 0);
        let name = session_file_name("device", started);
        let session = parse_session_file_name(&name).unwrap();
        assert_eq!(session.address, "device");
        assert_eq!(session.started, started.naive_local());
    }

    #[test]
    fn test_prepare_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        prepare_log_directory(&nested).unwrap();
        assert!(nested.is_dir());

        // preparing again is fine
        assert!(prepare_log_directory(&nested).is_ok());
    }

    #[test]
    fn test_prepare_rejects_plain_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "x").unwrap();

        let err = prepare_log_directory(&file).unwrap_err();
        assert!(matches!(err, StorageError::DirectoryUnusable(p) if p == file));
    }

    #[test]
    fn test_list_log_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b_20240101_000000.log", "a_20240101_000000.log", "c.LOG", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.log")).unwrap();

        let names: Vec<_> = list_log_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["a_20240101_000000.log", "b_20240101_000000.log", "c.LOG"]
        );
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = list_log_files(&missing).unwrap_err();
        assert!(matches!(err, QueryError::DirectoryUnreadable(p, _) if p == missing));
    }
}
