//! Config discovery, logging setup, and shutdown signal handling.

use std::path::PathBuf;

use ingestd_config::Config;
use ingestd_telemetry::LoggingConfig;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::supervisor::{DRAIN_TIMEOUT, spawn_pipelines};

/// Configuration path used when `INGESTD_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ingestd/config.toml";

/// Boot the daemon and block until a shutdown signal has been handled.
///
/// # Errors
///
/// Returns an error if logging cannot be installed, the configuration is
/// missing or invalid, or a signal handler cannot be registered. Everything
/// after startup is per-file and reported through the event sink instead.
pub async fn run_app() -> AppResult<()> {
    ingestd_telemetry::init_logging(&LoggingConfig::default()).map_err(|source| {
        AppError::Telemetry {
            operation: "telemetry.init",
            source,
        }
    })?;

    let path = config_path();
    let config = Config::load(&path).map_err(|source| AppError::Config {
        operation: "config.load",
        source,
    })?;
    info!(path = %path.display(), "configuration loaded");

    let (shutdown_tx, _) = broadcast::channel(1);
    let mut tasks = spawn_pipelines(config, &shutdown_tx);

    wait_for_shutdown_signal().await?;
    info!("shutdown requested, draining pipelines");
    let _ = shutdown_tx.send(());

    if tokio::time::timeout(DRAIN_TIMEOUT, drain(&mut tasks))
        .await
        .is_err()
    {
        warn!("drain window elapsed, aborting remaining stages");
        tasks.abort_all();
    }
    info!("ingestd stopped");
    Ok(())
}

fn config_path() -> PathBuf {
    std::env::var_os("INGESTD_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

async fn drain(tasks: &mut JoinSet<()>) {
    while tasks.join_next().await.is_some() {}
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> AppResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|source| AppError::Signal {
        operation: "signal.sigterm",
        source,
    })?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> AppResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Signal {
            operation: "signal.ctrl_c",
            source,
        })?;
    Ok(())
}
