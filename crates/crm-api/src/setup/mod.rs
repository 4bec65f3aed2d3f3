//! Application setup and initialization
//!
//! Everything `main` needs, kept out of `main.rs` so tests can build the
//! same state and router.

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use crm_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        store_backend = ?config.store_backend,
        "Configuration loaded and validated successfully"
    );

    let backend = crm_db::create_backend(&config)
        .await
        .context("Failed to initialize record store")?;

    let state = services::initialize_services(&config, backend)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
