use std::io;
use std::sync::Arc;

use log::info;

use crate::configuration::config::Config;
use crate::configuration::types::{CaptureSettings, Mode, QuerySettings};
use crate::data_capture::capture_session::run_capture;
use crate::data_capture::shutdown::{listen_for_os_signals, ShutdownSignal};
use crate::data_capture::types::CaptureSummary;
use crate::error_handling::types::ApplicationError;
use crate::query::query_runner::{run_query, QuerySummary, RecordRenderer};
use crate::query::table_renderer::AsciiTableRenderer;
use crate::storage::file_storage::prepare_log_directory;

/// Runs the command selected by the configuration.
pub struct Controller {
    pub config: Config,
    signal: Arc<ShutdownSignal>,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            signal: ShutdownSignal::new(),
        }
    }

    pub async fn run(&self) -> Result<(), ApplicationError> {
        match &self.config.mode {
            Mode::Capture(settings) => {
                self.capture(settings).await?;
            }
            Mode::Query(settings) => {
                let stdout = io::stdout();
                self.query(settings, &mut AsciiTableRenderer::new(stdout.lock()))?;
            }
        }
        Ok(())
    }

    pub async fn capture(&self, settings: &CaptureSettings) -> Result<CaptureSummary, ApplicationError> {
        prepare_log_directory(&settings.log_dir)?;

        let listener = listen_for_os_signals(&self.signal);
        let result = run_capture(settings, Arc::clone(&self.signal)).await;
        listener.abort();

        let summary = result?;
        info!(
            "Session log {} complete ({})",
            summary.path.display(),
            summary.reason
        );
        Ok(summary)
    }

    pub fn query<R>(&self, settings: &QuerySettings, renderer: &mut R) -> Result<QuerySummary, ApplicationError>
    where
        R: RecordRenderer + ?Sized,
    {
        Ok(run_query(settings, renderer)?)
    }
}
