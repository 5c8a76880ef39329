use delivery_watch::config::{AppConfig, LoggingConfig};
use delivery_watch::error::{AppError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Load and validate configuration; every problem is reported at once.
pub fn load_config(path: &str) -> Result<AppConfig> {
    let config = AppConfig::load_from(path)?;
    config
        .validate()
        .map_err(|errors| AppError::InvalidConfig(errors.join("; ")))?;
    Ok(config)
}

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live as long as the process.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level)));

    // `tracing_appender::rolling` panics if it can't create the file, so
    // preflight writability first.
    let (file_layer, guard) = match open_log_writer(&config.file) {
        Ok((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string())),
            ),
            Some(guard),
        ),
        Err(reason) => {
            eprintln!(
                "Warning: Could not write to log file {} ({}), file logging disabled",
                config.file.display(),
                reason
            );
            (None, None)
        }
    };

    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn open_log_writer(
    file: &Path,
) -> std::result::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), String> {
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = file
        .file_name()
        .ok_or_else(|| "log path has no file name".to_string())?;

    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(name))
        .map_err(|e| e.to_string())?;

    let appender = tracing_appender::rolling::never(dir, name);
    Ok(tracing_appender::non_blocking(appender))
}
