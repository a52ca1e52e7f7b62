//! Versioncast daemon.
//!
//! Wires one [`VersionedCell`] to a periodic [`BroadcastLoop`] and the
//! HTTP/`WebSocket` server, then runs until Ctrl-C or until the loop
//! stops on its own.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `versioncast-config.yaml` (or the path in
//!    `VERSIONCAST_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the configuration
//! 4. Create the cell and spawn the broadcast loop
//! 5. Spawn the server
//! 6. Wait for Ctrl-C or loop termination
//! 7. Shut down the server, stop the loop, and log the report

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use versioncast_core::broadcaster::log_report;
use versioncast_core::config::{LoggingConfig, VersioncastConfig};
use versioncast_core::{BroadcastLoop, TemplateSource, VersionedCell};
use versioncast_server::{spawn_server, AppState};

use crate::error::DaemonError;

/// Environment variable naming an alternate config file.
const CONFIG_PATH_ENV: &str = "VERSIONCAST_CONFIG";

/// Config file read when `VERSIONCAST_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "versioncast-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the server cannot bind,
/// or a background task fails.
#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    // 1. Load configuration. Logging depends on it, so report the source after.
    let (config, config_path, found) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config_path = %config_path.display(),
        found,
        "versioncast starting"
    );

    // 3. Validate.
    config.validate()?;
    info!(
        tick_interval_ms = config.broadcast.tick_interval_ms,
        max_ticks = config.broadcast.max_ticks,
        address = %config.listen.address(),
        "Configuration loaded"
    );

    // 4. Create the cell and start producing.
    let cell = Arc::new(VersionedCell::with_initial_body(
        config.broadcast.initial_body.clone(),
    ));
    let source = TemplateSource::new(config.broadcast.body_template.clone());
    let broadcast = BroadcastLoop::new(Arc::clone(&cell), source, &config.broadcast);
    let state = Arc::new(AppState::with_loop_status(
        Arc::clone(&cell),
        broadcast.status(),
    ));
    let producer = broadcast.spawn();

    // 5. Start the server. A bind failure stops the loop before bailing.
    let (addr, server) = match spawn_server(&config.listen, Arc::clone(&state)).await {
        Ok(spawned) => spawned,
        Err(e) => {
            producer.stop().await?;
            return Err(e.into());
        }
    };
    info!(%addr, "Serving snapshots");

    // 6. Run until Ctrl-C or the loop stops on its own.
    let stopper = producer.cancel_signal();
    let join = producer.join();
    tokio::pin!(join);

    let finished = tokio::select! {
        report = &mut join => Some(report),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
            } else {
                info!("Ctrl-C received, shutting down");
            }
            None
        }
    };

    // 7. Shut down.
    state.shutdown.cancel();
    let report = if let Some(report) = finished {
        report?
    } else {
        stopper.cancel();
        join.await?
    };

    server
        .await
        .map_err(|e| DaemonError::ServerTask {
            message: e.to_string(),
        })??;

    log_report(&report);
    info!(
        final_version = cell.version(),
        "versioncast stopped"
    );
    Ok(())
}

/// Load configuration from `VERSIONCAST_CONFIG` or `versioncast-config.yaml`.
///
/// A missing file yields defaults (still with env overrides applied).
/// Returns the path consulted and whether it existed.
fn load_config() -> Result<(VersioncastConfig, PathBuf, bool), DaemonError> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if config_path.exists() {
        let config = VersioncastConfig::from_file(&config_path)?;
        Ok((config, config_path, true))
    } else {
        let config = VersioncastConfig::parse("")?;
        Ok((config, config_path, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
