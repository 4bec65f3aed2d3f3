pub mod account;
pub mod analytics;
pub mod auth;
pub mod onboarding;
pub mod opportunity;
pub mod tenant;
pub mod user;

pub use account::{Account, AccountCreate, AccountUpdate};
pub use analytics::{PipelineStage, StageDistribution, TenantSummary, TopAccount};
pub use auth::{
    ChangePasswordRequest, Claims, ForgotPasswordRequest, Jwk, Jwks, LoginForm, MessageResponse,
    ResetPasswordRequest, TokenClaims, TokenResponse,
};
pub use onboarding::{OnboardingRequest, OnboardingResponse, RegisterRequest};
pub use opportunity::{Opportunity, OpportunityCreate, OpportunityStage, OpportunityUpdate};
pub use tenant::{Tenant, TenantCreate, TenantUpdate, TENANT_PARTITION};
pub use user::{User, UserCreate, UserRole, UserSelfUpdate, UserUpdate};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// A record persisted through the key-value store.
///
/// Every entity lives in a named collection and is addressed by
/// `(partition_key, id)`. Tenant-owned entities use their `tenant_id` as the
/// partition; tenants themselves share [`TENANT_PARTITION`].
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name in the backend
    const COLLECTION: &'static str;
    /// Human readable name used in error messages
    const LABEL: &'static str;

    fn id(&self) -> &str;
    fn partition_key(&self) -> &str;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn created_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, now: DateTime<Utc>);
}

/// Merge-patch update: only the fields present in `self` change on `target`.
pub trait Patch<E> {
    fn apply(self, target: &mut E);
}

/// Entities with a reassignable owner.
pub trait Managed {
    fn manager_id(&self) -> &str;
    fn set_manager(&mut self, manager_id: String);
}

/// Globally unique identifier for new records, independent of tenant.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
