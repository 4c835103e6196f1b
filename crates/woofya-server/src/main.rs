//! Woofya Server - Main entry point

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use woofya_common::logging::{init_logging, LogConfig};

use woofya_server::{
    api::{self, AppState},
    config::Config,
    ingest::{IngestConfig, IngestOrchestrator},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("woofya-server")
        .filter_directives("woofya_server=debug,woofya_ingest=info,tower_http=debug")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    info!("Starting Woofya Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = api::open_store(&config.store)
        .await
        .context("Failed to open record store")?;

    let cancel = CancellationToken::new();

    let ingest_config = IngestConfig::from_env().context("Invalid ingestion configuration")?;
    let orchestrator_handle = if ingest_config.enabled {
        info!("Ingestion is enabled, starting orchestrator");
        let orchestrator = IngestOrchestrator::new(ingest_config, store.clone(), cancel.clone());
        Some(orchestrator.start())
    } else {
        info!("Ingestion is disabled (INGEST_ENABLED=false)");
        None
    };

    let state = AppState { store };
    api::serve(
        &config,
        state,
        shutdown_signal(cancel.clone(), config.server.shutdown_timeout_secs),
    )
    .await?;

    // Abandon any in-flight ingestion; a cancelled run never writes
    cancel.cancel();
    if let Some(handle) = orchestrator_handle {
        if let Err(e) = handle.await {
            tracing::error!("Ingestion task failed: {}", e);
        }
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(cancel: CancellationToken, timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    cancel.cancel();

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
