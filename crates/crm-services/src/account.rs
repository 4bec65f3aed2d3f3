use crm_core::models::{Account, AccountCreate, AccountUpdate};
use crm_core::AppError;
use crm_db::{Filter, TenantScopedStore};

use crate::{CrudService, UserService};

/// Accounts, with the manager's `managed_account_ids` kept in step.
///
/// The managed-account set is maintained best-effort: the account write is
/// authoritative and a failed set update only logs a warning.
#[derive(Clone)]
pub struct AccountService {
    crud: CrudService<Account>,
    users: UserService,
}

impl AccountService {
    pub fn new(store: TenantScopedStore<Account>, users: UserService) -> Self {
        Self {
            crud: CrudService::new(store),
            users,
        }
    }

    pub fn store(&self) -> &TenantScopedStore<Account> {
        self.crud.store()
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn create(&self, tenant_id: &str, request: AccountCreate) -> Result<Account, AppError> {
        self.users
            .require_manager(&request.manager_id, tenant_id)
            .await?;
        let account = self
            .crud
            .create(Account::new(tenant_id.to_string(), request))
            .await?;
        self.users
            .link_account(&account.manager_id, tenant_id, &account.account_id)
            .await;
        Ok(account)
    }

    pub async fn get(&self, account_id: &str, tenant_id: &str) -> Result<Account, AppError> {
        self.crud.get(account_id, tenant_id).await
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<Account>, AppError> {
        self.crud.list(tenant_id, Filter::new()).await
    }

    pub async fn update(
        &self,
        account_id: &str,
        tenant_id: &str,
        update: AccountUpdate,
    ) -> Result<Account, AppError> {
        if let Some(manager_id) = update.manager_id.as_deref() {
            self.users.require_manager(manager_id, tenant_id).await?;
        }
        let previous = self.crud.get(account_id, tenant_id).await?.manager_id;
        let account = self.crud.update(account_id, tenant_id, update).await?;
        self.move_link(&previous, &account).await;
        Ok(account)
    }

    pub async fn delete(&self, account_id: &str, tenant_id: &str) -> Result<Account, AppError> {
        self.crud.delete(account_id, tenant_id).await
    }

    /// Reassign the account's manager; nothing else changes.
    #[tracing::instrument(skip(self))]
    pub async fn change_manager(
        &self,
        account_id: &str,
        tenant_id: &str,
        manager_id: &str,
    ) -> Result<Account, AppError> {
        self.users.require_manager(manager_id, tenant_id).await?;
        let (previous, account) = self
            .crud
            .store()
            .change_manager(account_id, tenant_id, manager_id)
            .await?;
        self.move_link(&previous, &account).await;
        tracing::info!(account_id = %account_id, from = %previous, to = %manager_id, "Account manager changed");
        Ok(account)
    }

    /// An active account of the tenant, for use as a parent reference.
    pub async fn require_account(
        &self,
        account_id: &str,
        tenant_id: &str,
    ) -> Result<Account, AppError> {
        match self.crud.store().find(account_id, tenant_id).await? {
            Some(account) if account.is_active => Ok(account),
            _ => Err(AppError::BadRequest(format!(
                "Account {} is not an active account of this tenant",
                account_id
            ))),
        }
    }

    async fn move_link(&self, previous_manager: &str, account: &Account) {
        if previous_manager == account.manager_id {
            return;
        }
        self.users
            .unlink_account(previous_manager, &account.tenant_id, &account.account_id)
            .await;
        self.users
            .link_account(&account.manager_id, &account.tenant_id, &account.account_id)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_create_links_account_to_manager() {
        let fx = Fixture::new().await;
        let account = fx.account("Acme Corp").await;

        assert_eq!(account.tenant_id, fx.tenant.tenant_id);
        let admin = fx
            .users
            .get(&fx.admin.user_id, &fx.tenant.tenant_id)
            .await
            .unwrap();
        assert!(admin.managed_account_ids.contains(&account.account_id));
    }

    #[tokio::test]
    async fn test_create_ignores_payload_tenant() {
        let fx = Fixture::new().await;
        let account = fx
            .accounts
            .create(
                &fx.tenant.tenant_id,
                AccountCreate {
                    name: "Spoof".to_string(),
                    manager_id: fx.admin.user_id.clone(),
                    tenant_id: Some("someone-else".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(account.tenant_id, fx.tenant.tenant_id);
        assert!(fx.accounts.list("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manager_must_belong_to_tenant() {
        let fx = Fixture::new().await;
        let other = fx.onboard("Globex", "boss@globex.test").await;
        let err = fx
            .accounts
            .create(
                &fx.tenant.tenant_id,
                AccountCreate {
                    name: "Acme Corp".to_string(),
                    manager_id: other.admin.user_id.clone(),
                    tenant_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_change_manager_moves_managed_account() {
        let fx = Fixture::new().await;
        let account = fx.account("Acme Corp").await;
        let rep = fx.member("rep@acme.test").await;

        let updated = fx
            .accounts
            .change_manager(&account.account_id, &fx.tenant.tenant_id, &rep.user_id)
            .await
            .unwrap();
        assert_eq!(updated.manager_id, rep.user_id);
        assert_eq!(updated.name, account.name);

        let admin = fx
            .users
            .get(&fx.admin.user_id, &fx.tenant.tenant_id)
            .await
            .unwrap();
        let rep = fx
            .users
            .get(&rep.user_id, &fx.tenant.tenant_id)
            .await
            .unwrap();
        assert!(!admin.managed_account_ids.contains(&account.account_id));
        assert!(rep.managed_account_ids.contains(&account.account_id));
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_touch_account() {
        let fx = Fixture::new().await;
        let account = fx.account("Acme Corp").await;
        let other = fx.onboard("Globex", "boss@globex.test").await;
        let other_tenant = &other.tenant.tenant_id;

        assert!(matches!(
            fx.accounts
                .get(&account.account_id, other_tenant)
                .await
                .unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(fx
            .accounts
            .delete(&account.account_id, other_tenant)
            .await
            .is_err());
        assert!(fx.accounts.list(other_tenant).await.unwrap().is_empty());
        assert!(fx
            .accounts
            .get(&account.account_id, &fx.tenant.tenant_id)
            .await
            .unwrap()
            .is_active);
    }
}
