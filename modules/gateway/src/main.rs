//! Gateway binary entrypoint.
//!
//! Loads configuration from environment variables, wires stores and
//! services, and runs the HTTP server next to the consistency sweep.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use gateway::config::Config;
use gateway::middleware::AuthState;
use gateway::observability::{LogFormat, init_logging};
use gateway::router::build_router;
use gateway::state::{AppState, Stores, checkout_provider};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    let stores = if let Some(url) = config.database_url.as_deref() {
        tracing::info!("using Postgres stores");
        Stores::postgres(url, config.max_connections).await?
    } else {
        if !config.debug {
            anyhow::bail!("DATABASE_URL is required when PARCEL_DEBUG=false");
        }
        tracing::warn!("DATABASE_URL not set; using in-memory stores (debug only)");
        Stores::in_memory()
    };

    let provider = checkout_provider(&config)?;
    let state = AppState::assemble(&config, &stores, provider);
    let auth = Arc::new(AuthState::new(&config, Arc::clone(&stores.users)));

    let sweep = tokio::spawn(framework::cron::run_interval(
        state.sweep.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    ));

    let router = build_router(state, auth);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(http_port = config.http_port, "starting gateway");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
