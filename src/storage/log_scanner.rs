//! Time-ordered scan of a session log.
//!
//! Lines are read in file order and turned back into events. Events before the
//! window are skipped; the first event after the window ends the scan, since
//! session logs are written in receipt order. Lines that do not decode are
//! reported and skipped without interrupting the scan.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::data_capture::codec;
use crate::data_capture::types::TelemetryEvent;
use crate::error_handling::types::QueryError;

/// Inclusive range of receipt times, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl TimeWindow {
    pub fn new(start_millis: i64, end_millis: i64) -> Self {
        Self {
            start_millis,
            end_millis,
        }
    }

    pub fn contains(&self, millis: i64) -> bool {
        millis >= self.start_millis && millis <= self.end_millis
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(0, i64::MAX)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub lines_read: u64,
    pub malformed_lines: u64,
    pub matched: u64,
    /// Set when an event past the window ended the scan.
    pub stopped_early: bool,
}

pub struct LogScanner {
    path: PathBuf,
    reader: BufReader<File>,
}

impl LogScanner {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, QueryError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                error!("Log file does not exist: {}", path.display());
                QueryError::MissingLogFile(path.clone())
            } else {
                error!("Failed to open log file {}: {}", path.display(), e);
                QueryError::Io(e)
            }
        })?;

        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily yields the events of type `tag` inside `window`.
    pub fn scan(self, tag: &str, window: TimeWindow) -> Scan {
        debug!(
            "Scanning {} for '{}' in [{}, {}]",
            self.path.display(),
            tag,
            window.start_millis,
            window.end_millis
        );
        Scan {
            path: self.path,
            reader: self.reader,
            tag: tag.to_string(),
            window,
            buffer: Vec::new(),
            stats: ScanStats::default(),
            finished: false,
        }
    }
}

/// Iterator returned by [`LogScanner::scan`].
pub struct Scan {
    path: PathBuf,
    reader: BufReader<File>,
    tag: String,
    window: TimeWindow,
    buffer: Vec<u8>,
    stats: ScanStats,
    finished: bool,
}

impl Scan {
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            "Finished {}: {} line(s), {} malformed, {} match(es){}",
            self.path.display(),
            self.stats.lines_read,
            self.stats.malformed_lines,
            self.stats.matched,
            if self.stats.stopped_early {
                ", stopped at end of window"
            } else {
                ""
            }
        );
    }
}

impl Iterator for Scan {
    type Item = TelemetryEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => self.finish(),
                Ok(_) => {
                    self.stats.lines_read += 1;
                    let line = self.buffer.strip_suffix(b"\n").unwrap_or(&self.buffer[..]);

                    let decoded = match std::str::from_utf8(line) {
                        Ok(text) => codec::decode(text).map_err(|e| e.to_string()),
                        Err(e) => Err(format!("Malformed log line (invalid UTF-8): {}", e)),
                    };
                    let event = match decoded {
                        Ok(event) => event,
                        Err(e) => {
                            self.stats.malformed_lines += 1;
                            error!(
                                "{} line {}: {}",
                                self.path.display(),
                                self.stats.lines_read,
                                e
                            );
                            continue;
                        }
                    };

                    if event.is_before(self.window.start_millis) {
                        continue;
                    }
                    if event.is_after(self.window.end_millis) {
                        self.stats.stopped_early = true;
                        self.finish();
                        break;
                    }
                    if event.has_tag(&self.tag) {
                        self.stats.matched += 1;
                        return Some(event);
                    }
                }
                Err(e) => {
                    error!("Failed to read {}: {}", self.path.display(), e);
                    self.finish();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_log(dir: &TempDir, content: &[u8]) -> PathBuf {
        let path = dir.path().join("dev_20240101_000000.log");
        fs::write(&path, content).unwrap();
        path
    }

    fn timestamps(scan: Scan) -> Vec<i64> {
        scan.map(|e| e.timestamp_millis()).collect()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            b"100,{\"fm\":{}}\n200,{\"fm\":{}}\n300,{\"fm\":{}}\n400,{\"fm\":{}}\n",
        );

        let scan = LogScanner::open(&path)
            .unwrap()
            .scan("fm", TimeWindow::new(200, 300));
        assert_eq!(timestamps(scan), vec![200, 300]);
    }

    #[test]
    fn test_scan_stops_at_first_event_past_window() {
        let dir = TempDir::new().unwrap();
        // 250 sits after an out-of-window event and must not be reached
        let path = write_log(
            &dir,
            b"100,{\"fm\":{}}\n400,{\"fm\":{}}\n250,{\"fm\":{}}\n",
        );

        let mut scan = LogScanner::open(&path)
            .unwrap()
            .scan("fm", TimeWindow::new(0, 300));
        assert_eq!(scan.next().map(|e| e.timestamp_millis()), Some(100));
        assert!(scan.next().is_none());
        assert!(scan.next().is_none());

        let stats = scan.stats();
        assert!(stats.stopped_early);
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"abc,{}\n1000,{\"fm\":{\"rs\":3}}\n\n");

        let mut scan = LogScanner::open(&path).unwrap().scan("fm", TimeWindow::default());
        let event = scan.next().unwrap();
        assert_eq!(event.timestamp_millis(), 1000);
        assert!(scan.next().is_none());

        let stats = scan.stats();
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.malformed_lines, 2);
        assert!(!stats.stopped_early);
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"5,\xff\xfe\n6,{\"sm\":{}}\n");

        let mut scan = LogScanner::open(&path).unwrap().scan("sm", TimeWindow::default());
        assert_eq!(scan.next().map(|e| e.timestamp_millis()), Some(6));
        assert_eq!(scan.stats().malformed_lines, 1);
    }

    #[test]
    fn test_type_filter_and_undecodable_payloads() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            b"1,{\"cc\":{}}\n2,not json\n3,{\"hc\":{},\"cc\":{}}\n4,[1,2]\n5,{\"ccx\":{}}\r\n",
        );

        let scan = LogScanner::open(&path).unwrap().scan("cc", TimeWindow::default());
        assert_eq!(timestamps(scan), vec![1, 3]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.log");
        let err = LogScanner::open(&missing).err();
        assert!(matches!(err, Some(QueryError::MissingLogFile(p)) if p == missing));
    }

    #[test]
    fn test_default_window_admits_everything_non_negative() {
        let window = TimeWindow::default();
        assert!(window.contains(0));
        assert!(window.contains(i64::MAX));
        assert!(!window.contains(-1));
    }
}
