//! Query over every session log of a directory.
//!
//! Files are handled one at a time and independently: each is scanned for the
//! requested type and window, its events are decoded, and a file with at least
//! one record is handed to the renderer under its file name.

use std::io;
use std::path::Path;

use log::{debug, info, warn};

use crate::configuration::types::QuerySettings;
use crate::decoding::{decode_event, FieldRecord, MessageType};
use crate::error_handling::types::QueryError;
use crate::storage::file_storage::{list_log_files, parse_session_file_name};
use crate::storage::log_scanner::{LogScanner, ScanStats, TimeWindow};

/// Output seam of the query side.
pub trait RecordRenderer {
    fn render(&mut self, file_name: &str, records: &[FieldRecord]) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QuerySummary {
    pub files_scanned: usize,
    pub files_with_output: usize,
    pub records_rendered: usize,
    pub malformed_lines: u64,
}

pub fn run_query<R>(settings: &QuerySettings, renderer: &mut R) -> Result<QuerySummary, QueryError>
where
    R: RecordRenderer + ?Sized,
{
    let files = list_log_files(&settings.log_dir)?;
    info!(
        "Querying {} log file(s) in {} for '{}'",
        files.len(),
        settings.log_dir.display(),
        settings.message_type
    );
    if MessageType::from_tag(&settings.message_type).is_none() {
        warn!(
            "No field layout for message type '{}', matching events show only their timestamp",
            settings.message_type
        );
    }

    let mut summary = QuerySummary::default();
    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match parse_session_file_name(&file_name) {
            Some(session) => debug!(
                ">>>>> {} (device {}, started {})",
                file_name, session.address, session.started
            ),
            None => debug!(">>>>> {} (not a session file name)", file_name),
        }

        let (records, stats) = query_file(path, &settings.message_type, settings.window)?;
        summary.files_scanned += 1;
        summary.malformed_lines += stats.malformed_lines;

        if records.is_empty() {
            debug!("No matching log lines were found");
        } else {
            renderer
                .render(&file_name, &records)
                .map_err(QueryError::Render)?;
            summary.files_with_output += 1;
            summary.records_rendered += records.len();
        }
        debug!("<<<<< {}", file_name);
    }

    info!(
        "Query done: {} record(s) from {} of {} file(s)",
        summary.records_rendered, summary.files_with_output, summary.files_scanned
    );
    Ok(summary)
}

/// Decoded records of the events of type `tag` inside `window`.
pub fn query_file(
    path: &Path,
    tag: &str,
    window: TimeWindow,
) -> Result<(Vec<FieldRecord>, ScanStats), QueryError> {
    let mut scan = LogScanner::open(path)?.scan(tag, window);
    let records: Vec<FieldRecord> = scan.by_ref().map(|event| decode_event(&event)).collect();
    Ok((records, scan.stats()))
}
