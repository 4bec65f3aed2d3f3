//! Authorization context resolution.
//!
//! A verified token only says who the caller claims to be. The resolver loads
//! the caller's own user record and derives the effective tenant and role from
//! it, so request payloads never influence tenant scoping.

use std::sync::Arc;

use crm_core::models::{Claims, User, UserRole};
use crm_core::AppError;
use crm_db::TenantScopedStore;

use crate::identity::IdentityBackend;

/// Effective identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// Always the stored user's tenant
    pub tenant_id: String,
    /// `admin` only when both the token and the user record say so
    pub role: UserRole,
    /// Active only when both the token and the user record say so
    pub is_active: bool,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn require_active(&self) -> Result<&Self, AppError> {
        if !self.is_active {
            return Err(AppError::InactiveUser);
        }
        Ok(self)
    }

    /// Active and admin
    pub fn require_admin(&self) -> Result<&Self, AppError> {
        self.require_active()?;
        if self.role != UserRole::Admin {
            return Err(AppError::InsufficientPrivilege);
        }
        Ok(self)
    }
}

#[derive(Clone)]
pub struct AuthContextResolver {
    users: TenantScopedStore<User>,
    identity: Arc<dyn IdentityBackend>,
}

impl AuthContextResolver {
    pub fn new(users: TenantScopedStore<User>, identity: Arc<dyn IdentityBackend>) -> Self {
        Self { users, identity }
    }

    #[tracing::instrument(skip(self, claims), fields(user_id = %claims.user_id))]
    pub async fn resolve(&self, claims: &Claims) -> Result<AuthContext, AppError> {
        if let Some(token_session) = claims.session {
            let current = self.identity.session_generation(&claims.user_id).await?;
            if current != Some(token_session) {
                tracing::debug!("Rejected token from a revoked session");
                return Err(AppError::Unauthorized("Token has been revoked".to_string()));
            }
        }

        let user = self
            .users
            .find(&claims.user_id, &claims.tenant_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Token subject has no user record in its tenant");
                AppError::Unauthorized("Could not validate credentials".to_string())
            })?;

        let role = if claims.role == UserRole::Admin && user.role == UserRole::Admin {
            UserRole::Admin
        } else {
            UserRole::User
        };

        Ok(AuthContext {
            tenant_id: user.tenant_id.clone(),
            role,
            is_active: claims.is_active && user.is_active,
            user,
        })
    }
}
