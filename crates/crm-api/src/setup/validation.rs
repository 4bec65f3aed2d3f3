//! Startup validation beyond what [`Config::validate`] checks on its own.

use anyhow::Result;
use crm_core::{Config, StoreBackend};

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() {
        if config.store_backend == StoreBackend::Memory {
            tracing::warn!("In-memory record store in production: data is lost on restart");
        }
        if config.jwks_url.is_none() {
            tracing::warn!("No JWKS_URL configured: only locally issued tokens are accepted");
        }
    }

    if config.jwks_url.is_some() && config.jwks_cache_ttl_seconds.is_none() {
        tracing::info!("JWKS keys are refreshed only when a token names an unknown key");
    }

    if config.db_timeout_seconds == 0 {
        anyhow::bail!("DB_TIMEOUT_SECONDS must be greater than 0");
    }

    Ok(())
}
