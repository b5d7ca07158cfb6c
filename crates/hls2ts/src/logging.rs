//! Console + rotating file logging, built the way the rest of the stack does it.
//!
//! Unlike a service with an HTTP control plane, there's no reload handle or log-streaming
//! layer here: the filter is fixed for the process lifetime.

use std::path::{Path, PathBuf};

use broadcast_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber from `config`, optionally overriding the
/// console level to debug and the file sink's directory. Returns the file-appender's
/// [`WorkerGuard`]; dropping it flushes and stops the background writer thread, so the
/// caller must keep it alive for the life of the process.
pub fn init_logging(config: &LoggingConfig, verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hls2ts={level},broadcast_core={level},hls_ingest={level},ts={level}")));

    let console_layer = config
        .console
        .then(|| fmt::layer().with_ansi(true).with_target(false));

    let (file_layer, guard) = if config.file.enabled {
        let owned_dir: PathBuf = log_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(&config.file.path));
        let dir = owned_dir.as_path();
        std::fs::create_dir_all(dir).map_err(|e| format!("creating log directory {}: {e}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "hls2ts.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| format!("installing tracing subscriber: {e}"))?;

    Ok(guard)
}
