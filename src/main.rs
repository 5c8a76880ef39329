mod main_dispatch;
mod main_runtime;

use clap::Parser;
use delivery_watch::cli::Cli;
use delivery_watch::config::LoggingConfig;
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match main_runtime::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            let _guard = main_runtime::init_logging(&LoggingConfig::default());
            error!("Failed to load config {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = main_runtime::init_logging(&config.logging);

    match main_dispatch::run(cli.command(), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
