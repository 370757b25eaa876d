//! Append-only session log writer.
//!
//! A [`LogWriter`] owns the single log file of one capture session. Appends and
//! the final close go through the same lock, so a close issued from the
//! shutdown path waits for an in-flight append and every later append fails
//! with [`StorageError::Closed`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use crate::error_handling::types::StorageError;

use super::codec;
use super::types::TelemetryEvent;

const BUFFER_SIZE: usize = 8192;

pub struct LogWriter {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    lines_written: AtomicU64,
}

impl LogWriter {
    /// Creates `directory/filename` and opens it for appending.
    ///
    /// Errors
    /// - [`StorageError::DirectoryUnusable`] if `directory` is not an existing directory.
    /// - [`StorageError::AlreadyExists`] if the target file is already there; historical
    ///   logs are never overwritten.
    /// - [`StorageError::Io`] for any other failure while creating the file.
    pub fn open<P: AsRef<Path>>(directory: P, filename: &str) -> Result<Self, StorageError> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            error!("Log directory {} is not usable", directory.display());
            return Err(StorageError::DirectoryUnusable(directory.to_path_buf()));
        }

        let path = directory.join(filename);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(path.clone())
                } else {
                    error!("Failed to create log file {}: {}", path.display(), e);
                    StorageError::Io(e)
                }
            })?;

        info!("Opened session log {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::with_capacity(BUFFER_SIZE, file))),
            lines_written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    /// Encodes `event` and appends it as one line.
    pub fn append(&self, event: &TelemetryEvent) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let writer = guard.as_mut().ok_or(StorageError::Closed)?;

        let mut line = codec::encode(event);
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        self.lines_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Flushes buffered lines and releases the file.
    ///
    /// Calling it again after the first close has no effect.
    pub fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let Some(mut writer) = guard.take() else {
            debug!("Log writer for {} already closed", self.path.display());
            return Ok(());
        };

        writer.flush().map_err(|e| {
            error!("Failed to finish writing {}: {}", self.path.display(), e);
            StorageError::Io(e)
        })?;
        writer.get_ref().sync_all().map_err(|e| {
            error!("Failed to sync {}: {}", self.path.display(), e);
            StorageError::Io(e)
        })?;

        info!(
            "Closed session log {} ({} line(s))",
            self.path.display(),
            self.lines_written()
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
