mod api;
mod bootstrap;
mod health;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use agencyvault_core::config::{AppConfig, LoadOptions};
use agencyvault_core::DryRunChannel;
use agencyvault_db::SqlOutreachStore;
use anyhow::Result;

use crate::api::AppState;
use crate::workers::Workers;

fn init_logging(config: &AppConfig) {
    use agencyvault_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);

    let state = AppState {
        store: Arc::new(SqlOutreachStore::new(app.db_pool.clone())),
        config: Arc::new(app.config),
        channel: Arc::new(DryRunChannel::default()),
    };
    if state.config.server.admin_token.is_none() {
        tracing::warn!(
            event_name = "system.server.admin_token_missing",
            correlation_id = "bootstrap",
            "no admin token configured; mutating routes are open"
        );
    }

    let workers = Workers::spawn(&state);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        workers = workers.running(),
        "agencyvault-server started"
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(signal_error) = wait_for_shutdown().await {
                tracing::error!(
                    event_name = "system.server.signal_failed",
                    error = %signal_error,
                    "failed to listen for shutdown signal"
                );
            }
        })
        .await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "agencyvault-server stopping"
    );
    if tokio::time::timeout(grace, workers.shutdown()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.workers_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "workers did not stop within the grace period"
        );
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
