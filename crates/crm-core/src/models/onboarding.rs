use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{Tenant, TenantCreate, User, UserCreate};

/// New tenant together with its first administrator.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct OnboardingRequest {
    #[validate(nested)]
    pub tenant: TenantCreate,
    /// The requested role is ignored; the first user is always an admin.
    #[validate(nested)]
    pub admin: UserCreate,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnboardingResponse {
    pub tenant: Tenant,
    pub admin: User,
}

/// Public self-registration into an existing tenant. Always yields role `user`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub given_name: String,
    #[validate(length(min = 1, max = 100))]
    pub family_name: String,
}
