//! Reasoning Service - failure root cause analysis and prediction API

use anyhow::Result;
use reasoning_service::{api, build_state, config::ServiceConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting reasoning-service");

    let config = ServiceConfig::load()?;
    info!(
        service_name = %config.service_name,
        port = config.port,
        case_store_path = ?config.case_store_path,
        "Service configured"
    );

    let state = build_state(&config).await?;
    state.logger.log_startup(
        SERVICE_VERSION,
        state.engine.case_store().backend(),
        state.engine.predictor().anomaly_detection_available(),
    );

    state.health_registry.set_ready(true).await;

    let logger = state.logger.clone();
    let shutdown = async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger.log_shutdown("SIGINT received");
        }
    };

    api::serve(&config.bind_addr(), state, shutdown).await?;
    info!("Shutting down");

    Ok(())
}
