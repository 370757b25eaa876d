use clap::Parser;
use cst_logs::configuration::config::{Cli, Config};
use cst_logs::configuration::types::DEFAULT_LOG_LEVEL;
use cst_logs::controller::Controller;
use cst_logs::error_handling::types::ApplicationError;
use log::{debug, error};

#[tokio::main]
async fn main() {
    // Get command-line arguments; usage errors exit here with clap's status
    let cli = Cli::parse();
    let config = Config::from_cli(cli);

    env_logger::Builder::from_default_env()
        .filter_level(
            config
                .as_ref()
                .map(|c| c.log_level)
                .unwrap_or(DEFAULT_LOG_LEVEL),
        )
        .format_target(false)
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(ApplicationError::from(e).exit_code());
        }
    };
    config.report_warnings();
    debug!("Configuration imported: {:?}", config);

    let controller = Controller::new(config);
    if let Err(e) = controller.run().await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
