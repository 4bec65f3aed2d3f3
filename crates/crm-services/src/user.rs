use std::sync::Arc;

use crm_core::models::{User, UserSelfUpdate, UserUpdate};
use crm_core::AppError;
use crm_db::{Filter, TenantScopedStore};

use crate::identity::{IdentityBackend, UserAttributes};
use crate::CrudService;

/// User records. Creation goes through provisioning (see `OnboardingService`)
/// because every user needs an identity first.
#[derive(Clone)]
pub struct UserService {
    crud: CrudService<User>,
    identity: Arc<dyn IdentityBackend>,
}

impl UserService {
    pub fn new(store: TenantScopedStore<User>, identity: Arc<dyn IdentityBackend>) -> Self {
        Self {
            crud: CrudService::new(store),
            identity,
        }
    }

    pub fn store(&self) -> &TenantScopedStore<User> {
        self.crud.store()
    }

    pub async fn insert(&self, user: User) -> Result<User, AppError> {
        self.crud.create(user).await
    }

    pub async fn get(&self, user_id: &str, tenant_id: &str) -> Result<User, AppError> {
        self.crud.get(user_id, tenant_id).await
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<User>, AppError> {
        self.crud.list(tenant_id, Filter::new()).await
    }

    /// Admin update. Role and activity changes are mirrored onto the identity.
    pub async fn update(
        &self,
        user_id: &str,
        tenant_id: &str,
        update: UserUpdate,
    ) -> Result<User, AppError> {
        let attributes = UserAttributes {
            role: update.role,
            is_active: update.is_active,
        };
        let user = self.crud.update(user_id, tenant_id, update).await?;
        self.sync_identity(user_id, attributes).await;
        Ok(user)
    }

    /// Self-service update: names only.
    pub async fn update_self(
        &self,
        user_id: &str,
        tenant_id: &str,
        update: UserSelfUpdate,
    ) -> Result<User, AppError> {
        self.crud
            .update(user_id, tenant_id, UserUpdate::from(update))
            .await
    }

    pub async fn delete(&self, user_id: &str, tenant_id: &str) -> Result<User, AppError> {
        let user = self.crud.delete(user_id, tenant_id).await?;
        self.sync_identity(
            user_id,
            UserAttributes {
                role: None,
                is_active: Some(false),
            },
        )
        .await;
        Ok(user)
    }

    /// An active user of the tenant, for use as an owner reference.
    pub async fn require_manager(&self, user_id: &str, tenant_id: &str) -> Result<User, AppError> {
        match self.crud.store().find(user_id, tenant_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::BadRequest(format!(
                "Manager {} is not an active user of this tenant",
                user_id
            ))),
        }
    }

    /// Record `account_id` as managed by `user_id`. Failures are logged, not returned.
    pub async fn link_account(&self, user_id: &str, tenant_id: &str, account_id: &str) {
        if let Err(e) = self
            .edit_managed_accounts(user_id, tenant_id, |u| u.add_managed_account(account_id))
            .await
        {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                account_id = %account_id,
                "Could not add account to manager's managed accounts"
            );
        }
    }

    /// Inverse of [`Self::link_account`], equally best-effort.
    pub async fn unlink_account(&self, user_id: &str, tenant_id: &str, account_id: &str) {
        if let Err(e) = self
            .edit_managed_accounts(user_id, tenant_id, |u| u.remove_managed_account(account_id))
            .await
        {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                account_id = %account_id,
                "Could not remove account from manager's managed accounts"
            );
        }
    }

    async fn edit_managed_accounts<F>(
        &self,
        user_id: &str,
        tenant_id: &str,
        edit: F,
    ) -> Result<(), AppError>
    where
        F: FnOnce(&mut User) -> bool,
    {
        let mut user = self.crud.get(user_id, tenant_id).await?;
        if edit(&mut user) {
            self.crud.store().put(user).await?;
        }
        Ok(())
    }

    /// Physically remove a user record. Rollback of failed provisioning only.
    pub async fn remove(&self, user_id: &str, tenant_id: &str) -> Result<(), AppError> {
        self.crud.store().remove(user_id, tenant_id).await?;
        Ok(())
    }

    async fn sync_identity(&self, user_id: &str, attributes: UserAttributes) {
        if attributes.is_empty() {
            return;
        }
        if let Err(e) = self
            .identity
            .update_user_attributes(user_id, attributes)
            .await
        {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                "Could not mirror user attributes to identity backend"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, PASSWORD};
    use crm_core::models::UserRole;

    #[tokio::test]
    async fn test_promotion_reaches_new_tokens() {
        let fx = Fixture::new().await;
        let rep = fx.member("rep@acme.test").await;
        let promoted = fx
            .users
            .update(
                &rep.user_id,
                &fx.tenant.tenant_id,
                UserUpdate {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
        assert_eq!(promoted.email, rep.email);

        let token = fx.identity.authenticate("rep@acme.test", PASSWORD).await;
        assert!(token.is_ok());
    }

    #[tokio::test]
    async fn test_self_update_keeps_role() {
        let fx = Fixture::new().await;
        let rep = fx.member("rep@acme.test").await;
        let updated = fx
            .users
            .update_self(
                &rep.user_id,
                &fx.tenant.tenant_id,
                UserSelfUpdate {
                    given_name: Some("Grace".to_string()),
                    family_name: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.given_name, "Grace");
        assert_eq!(updated.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_deleted_user_cannot_manage() {
        let fx = Fixture::new().await;
        let rep = fx.member("rep@acme.test").await;
        let deleted = fx
            .users
            .delete(&rep.user_id, &fx.tenant.tenant_id)
            .await
            .unwrap();
        assert!(!deleted.is_active);
        assert!(fx
            .users
            .list(&fx.tenant.tenant_id)
            .await
            .unwrap()
            .iter()
            .all(|u| u.user_id != rep.user_id));
        assert!(matches!(
            fx.users
                .require_manager(&rep.user_id, &fx.tenant.tenant_id)
                .await
                .unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_users_are_tenant_scoped() {
        let fx = Fixture::new().await;
        let other = fx.onboard("Globex", "boss@globex.test").await;
        assert!(matches!(
            fx.users
                .get(&other.admin.user_id, &fx.tenant.tenant_id)
                .await
                .unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            fx.users
                .require_manager(&other.admin.user_id, &fx.tenant.tenant_id)
                .await
                .unwrap_err(),
            AppError::BadRequest(_)
        ));
    }
}
