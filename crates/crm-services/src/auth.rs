use std::sync::Arc;

use crm_core::models::{
    ChangePasswordRequest, LoginForm, RegisterRequest, ResetPasswordRequest, TokenResponse, User,
    UserCreate, UserRole,
};
use crm_core::AppError;

use crate::identity::IdentityBackend;
use crate::OnboardingService;

/// Credential flows in front of the identity backend.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityBackend>,
    onboarding: OnboardingService,
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityBackend>, onboarding: OnboardingService) -> Self {
        Self {
            identity,
            onboarding,
        }
    }

    /// Public self-registration. The new user is never an admin.
    #[tracing::instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let user = UserCreate {
            email: request.email,
            password: request.password,
            given_name: request.given_name,
            family_name: request.family_name,
            role: UserRole::User,
        };
        self.onboarding
            .provision_user(&request.tenant_id, user, UserRole::User)
            .await
    }

    pub async fn login(&self, form: LoginForm) -> Result<TokenResponse, AppError> {
        let token = self
            .identity
            .authenticate(&form.username, &form.password)
            .await?;
        Ok(TokenResponse::bearer(token))
    }

    /// Revoke every token issued to the user, including the one in use.
    pub async fn logout(&self, user_id: &str) -> Result<(), AppError> {
        self.identity.global_sign_out(user_id).await
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        self.identity
            .change_password(user_id, &request.old_password, &request.new_password)
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        self.identity.forgot_password(email).await
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AppError> {
        self.identity
            .confirm_forgot_password(&request.email, &request.code, &request.new_password)
            .await
    }
}
