//! hls2ts - Live HLS to DVB Multicast Bridge
//!
//! Ingests one or more live HLS sources, normalizes the MPEG-TS segments into
//! DVB-compliant transport streams, and emits them as UDP/IP multicast for
//! broadcast playout equipment.

use std::process::exit;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use broadcast_core::{Config, InMemoryAlertSink, StreamManager};

mod cli;
mod logging;

use cli::CliArgs;

fn main() {
    let args = CliArgs::parse();

    let config = match load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            // Logging isn't initialized yet if the config itself can't be read, so this
            // failure has to reach the operator on stderr.
            eprintln!("failed to load configuration from {}: {e}", args.config.display());
            exit(1);
        }
    };

    let _guard = match logging::init_logging(&config.logging, args.verbose, args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            exit(1);
        }
    };

    info!("hls2ts v{} starting", env!("CARGO_PKG_VERSION"));

    if args.check_config {
        match validate_config(&config) {
            Ok(()) => {
                info!("configuration is valid, {} stream(s) configured", config.streams.len());
                return;
            }
            Err(e) => {
                error!("configuration invalid: {e}");
                exit(1);
            }
        }
    }

    if let Err(e) = validate_config(&config) {
        error!("configuration invalid: {e}");
        exit(1);
    }

    let alerts = InMemoryAlertSink::new();
    let manager = StreamManager::new(alerts);

    info!("starting {} configured stream(s)", config.streams.len());
    manager.start(&config.streams);

    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let running_sig = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        running_sig.store(false, std::sync::atomic::Ordering::SeqCst);
    }) {
        warn!("failed to install Ctrl-C handler: {e}");
    }

    while running.load(std::sync::atomic::Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(500));
    }

    info!("shutting down pipelines");
    manager.stop();
    info!("hls2ts shutdown complete");
}

fn load_config(path: &std::path::Path) -> Result<Config, String> {
    let body = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&body).map_err(|e| e.to_string())
}

fn validate_config(config: &Config) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for stream in &config.streams {
        stream.validate()?;
        if !seen.insert(&stream.id) {
            return Err(format!("duplicate stream id '{}'", stream.id));
        }
    }
    Ok(())
}
