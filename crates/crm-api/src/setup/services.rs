//! Service wiring
//!
//! One identity backend instance is built here and shared by every service
//! that needs it.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use crm_core::Config;
use crm_db::{KeyValueBackend, TenantScopedStore};
use crm_services::{
    AccountService, AnalyticsService, AuthContextResolver, AuthService, IdentityBackend,
    LocalIdentityProvider, LocalIdentitySettings, LogCodeSink, OnboardingService,
    OpportunityService, ResetCodeSink, TenantService, UserService,
};

use crate::auth::{CachePolicy, ChainedKeySource, HttpKeySource, KeySource, TokenVerifier};
use crate::state::AppState;

/// Build all services over `backend`, delivering reset codes to the log.
pub fn initialize_services(
    config: &Config,
    backend: Arc<dyn KeyValueBackend>,
) -> Result<Arc<AppState>> {
    initialize_services_with_sink(config, backend, Arc::new(LogCodeSink))
}

pub fn initialize_services_with_sink(
    config: &Config,
    backend: Arc<dyn KeyValueBackend>,
    sink: Arc<dyn ResetCodeSink>,
) -> Result<Arc<AppState>> {
    let provider = Arc::new(LocalIdentityProvider::new(
        backend.clone(),
        LocalIdentitySettings {
            signing_secret: config.identity_signing_secret.clone(),
            token_ttl: Duration::minutes(config.access_token_expire_minutes),
            issuer: config.token_issuer.clone(),
            audience: config.token_audience.clone(),
        },
        sink,
    ));
    let identity: Arc<dyn IdentityBackend> = provider.clone();

    let verifier = Arc::new(
        TokenVerifier::new(
            key_source(config, provider)?,
            CachePolicy::from_ttl_seconds(config.jwks_cache_ttl_seconds),
        )
        .with_audience(config.token_audience.clone())
        .with_issuer(config.token_issuer.clone()),
    );

    let tenants = TenantService::new(TenantScopedStore::new(backend.clone()));
    let users = UserService::new(TenantScopedStore::new(backend.clone()), identity.clone());
    let accounts = AccountService::new(TenantScopedStore::new(backend.clone()), users.clone());
    let opportunities = OpportunityService::new(
        TenantScopedStore::new(backend.clone()),
        accounts.clone(),
        users.clone(),
    );
    let analytics = AnalyticsService::new(accounts.clone(), opportunities.clone());
    let onboarding = OnboardingService::new(tenants.clone(), users.clone(), identity.clone());
    let auth = AuthService::new(identity.clone(), onboarding.clone());
    let resolver = AuthContextResolver::new(users.store().clone(), identity);

    tracing::info!("Services initialized");

    Ok(Arc::new(AppState {
        config: config.clone(),
        backend,
        tenants,
        users,
        accounts,
        opportunities,
        analytics,
        onboarding,
        auth,
        resolver,
        verifier,
    }))
}

/// Locally issued tokens always verify; a configured JWKS URL adds its keys.
fn key_source(
    config: &Config,
    provider: Arc<LocalIdentityProvider>,
) -> Result<Arc<dyn KeySource>> {
    let local: Arc<dyn KeySource> = provider;
    match &config.jwks_url {
        Some(url) => {
            tracing::info!(jwks_url = %url, "Accepting tokens signed by external JWKS keys");
            let remote: Arc<dyn KeySource> = Arc::new(HttpKeySource::new(url.clone())?);
            Ok(Arc::new(ChainedKeySource(vec![local, remote])))
        }
        None => Ok(local),
    }
}
