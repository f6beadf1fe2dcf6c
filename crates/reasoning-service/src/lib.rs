//! Reasoning service: HTTP adapter over the reasoning engine

pub mod api;
pub mod config;
pub mod error;

use anyhow::Result;
use reasoning_lib::{
    health::{components, HealthRegistry},
    open_case_store, ReasoningEngine,
};
use std::sync::Arc;

/// Build the engine, case store and health registry from configuration
pub async fn build_state(config: &config::ServiceConfig) -> Result<Arc<api::AppState>> {
    let opened = open_case_store(config.case_store_path.as_deref());
    let backend = opened.store.backend();
    let engine = Arc::new(ReasoningEngine::new(config.engine_config(), opened.store)?);

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;
    if opened.degraded {
        health_registry
            .set_degraded(
                components::CASE_STORE,
                format!("Configured case store unavailable, using {} fallback", backend),
            )
            .await;
    }
    if !engine.predictor().anomaly_detection_available() {
        health_registry
            .set_degraded(components::PREDICTOR, "Anomaly detection disabled")
            .await;
    }

    let state = Arc::new(api::AppState::new(engine, health_registry));
    if opened.degraded {
        state
            .logger
            .log_case_store_degraded(backend, "configured case file could not be loaded");
    }
    Ok(state)
}
