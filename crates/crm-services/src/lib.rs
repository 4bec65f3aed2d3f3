//! CRM Services Layer
//!
//! Business operations over the tenant-scoped store: per-entity services built
//! on one generic CRUD core, the analytics engine, multi-step onboarding as a
//! saga, the identity backend contract with its local implementation, and the
//! authorization context resolver. HTTP concerns stay in `crm-api`.

pub mod account;
pub mod analytics;
pub mod auth;
pub mod authz;
pub mod crud;
pub mod identity;
pub mod onboarding;
pub mod opportunity;
pub mod saga;
pub mod tenant;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use account::AccountService;
pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use authz::{AuthContext, AuthContextResolver};
pub use crud::CrudService;
pub use identity::{
    IdentityBackend, LocalIdentityProvider, LocalIdentitySettings, LogCodeSink, ResetCodeSink,
    SignUp, UserAttributes,
};
pub use onboarding::OnboardingService;
pub use opportunity::OpportunityService;
pub use saga::Saga;
pub use tenant::TenantService;
pub use user::UserService;
