//! Container Status Agent - exposes the state of every local container
//!
//! Serves `/metrics` (container name -> status JSON) and `/health` for
//! an external monitoring collector.

use anyhow::{Context, Result};
use status_agent::{api, AgentConfig, AppState, RateLimiter};
use status_lib::{create_engine_client, Aggregator, StatusMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const SERVICE_NAME: &str = "container-status-agent";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting container-status-agent");

    let config = AgentConfig::load()?;
    info!(
        port = config.port,
        backend = config.engine_backend.as_str(),
        "Agent configured"
    );

    let metrics = StatusMetrics::new();
    metrics.set_engine_backend(config.engine_backend.as_str());

    let logger = StructuredLogger::new(SERVICE_NAME);

    let engine = create_engine_client(&config.engine_settings())
        .context("Failed to create engine client")?;
    let aggregator = Aggregator::new(
        engine,
        config.aggregator_config(),
        metrics.clone(),
        logger.clone(),
    );

    let app_state = Arc::new(AppState::new(
        aggregator,
        metrics,
        RateLimiter::per_second(config.rate_limit_per_sec),
        config.request_timeout(),
    ));

    let addr = config.listen_addr();
    logger.log_startup(AGENT_VERSION, config.engine_backend.as_str(), &addr);

    let shutdown_logger = logger.clone();
    api::serve(&addr, app_state, async move {
        let reason = shutdown_signal().await;
        shutdown_logger.log_shutdown(reason);
    })
    .await?;

    info!("Shutting down");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, returning which one arrived
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    }
}
