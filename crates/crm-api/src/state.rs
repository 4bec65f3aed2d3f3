//! Application state shared by every handler.

use std::sync::Arc;

use crm_core::Config;
use crm_db::KeyValueBackend;
use crm_services::{
    AccountService, AnalyticsService, AuthContextResolver, AuthService, OnboardingService,
    OpportunityService, TenantService, UserService,
};

use crate::auth::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Raw store handle, used by the health check
    pub backend: Arc<dyn KeyValueBackend>,
    pub tenants: TenantService,
    pub users: UserService,
    pub accounts: AccountService,
    pub opportunities: OpportunityService,
    pub analytics: AnalyticsService,
    pub onboarding: OnboardingService,
    pub auth: AuthService,
    pub resolver: AuthContextResolver,
    pub verifier: Arc<TokenVerifier>,
}
