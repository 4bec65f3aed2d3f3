//! Identity backend contract
//!
//! The identity backend owns credentials, issues tokens and manages tenant
//! groups. The rest of the system depends only on [`IdentityBackend`];
//! [`LocalIdentityProvider`] is the implementation shipped with the service.

mod local;
mod reset;

pub use local::{LocalIdentityProvider, LocalIdentitySettings};
pub use reset::{LogCodeSink, ResetCodeSink};

use crm_core::models::UserRole;
use crm_core::AppError;

/// Attributes registered with a new identity
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub given_name: String,
    pub family_name: String,
    pub tenant_id: String,
    pub role: UserRole,
}

/// Attribute changes mirrored from the user record. `None` leaves a value unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserAttributes {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UserAttributes {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none()
    }
}

#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Register a new identity and return its subject (user id)
    async fn sign_up(&self, request: SignUp) -> Result<String, AppError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: UserAttributes,
    ) -> Result<(), AppError>;

    /// Exchange credentials for a signed access token
    async fn authenticate(&self, username: &str, password: &str) -> Result<String, AppError>;

    /// Revoke every token issued to the user so far
    async fn global_sign_out(&self, user_id: &str) -> Result<(), AppError>;

    async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError>;

    /// Issue a reset code. Unknown addresses succeed silently.
    async fn forgot_password(&self, email: &str) -> Result<(), AppError>;

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AppError>;

    async fn create_group(&self, group: &str, description: &str) -> Result<(), AppError>;

    async fn delete_group(&self, group: &str) -> Result<(), AppError>;

    async fn add_user_to_group(&self, user_id: &str, group: &str) -> Result<(), AppError>;

    /// Current session generation, compared against a token's `custom:session`
    /// claim. `None` when the backend does not track sessions for this user.
    async fn session_generation(&self, user_id: &str) -> Result<Option<u64>, AppError>;
}
