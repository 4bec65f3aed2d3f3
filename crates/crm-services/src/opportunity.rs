use crm_core::models::{Opportunity, OpportunityCreate, OpportunityUpdate};
use crm_core::AppError;
use crm_db::{Filter, TenantScopedStore};

use crate::{AccountService, CrudService, UserService};

#[derive(Clone)]
pub struct OpportunityService {
    crud: CrudService<Opportunity>,
    accounts: AccountService,
    users: UserService,
}

impl OpportunityService {
    pub fn new(
        store: TenantScopedStore<Opportunity>,
        accounts: AccountService,
        users: UserService,
    ) -> Self {
        Self {
            crud: CrudService::new(store),
            accounts,
            users,
        }
    }

    pub fn store(&self) -> &TenantScopedStore<Opportunity> {
        self.crud.store()
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn create(
        &self,
        tenant_id: &str,
        request: OpportunityCreate,
    ) -> Result<Opportunity, AppError> {
        self.accounts
            .require_account(&request.account_id, tenant_id)
            .await?;
        self.users
            .require_manager(&request.manager_id, tenant_id)
            .await?;
        self.crud
            .create(Opportunity::new(tenant_id.to_string(), request))
            .await
    }

    pub async fn get(&self, opportunity_id: &str, tenant_id: &str) -> Result<Opportunity, AppError> {
        self.crud.get(opportunity_id, tenant_id).await
    }

    /// Active opportunities, optionally restricted to one account.
    pub async fn list(
        &self,
        tenant_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<Opportunity>, AppError> {
        let filter = match account_id {
            Some(account_id) => Filter::new().eq("account_id", account_id),
            None => Filter::new(),
        };
        self.crud.list(tenant_id, filter).await
    }

    pub async fn update(
        &self,
        opportunity_id: &str,
        tenant_id: &str,
        update: OpportunityUpdate,
    ) -> Result<Opportunity, AppError> {
        if let Some(manager_id) = update.manager_id.as_deref() {
            self.users.require_manager(manager_id, tenant_id).await?;
        }
        self.crud.update(opportunity_id, tenant_id, update).await
    }

    pub async fn delete(
        &self,
        opportunity_id: &str,
        tenant_id: &str,
    ) -> Result<Opportunity, AppError> {
        self.crud.delete(opportunity_id, tenant_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_manager(
        &self,
        opportunity_id: &str,
        tenant_id: &str,
        manager_id: &str,
    ) -> Result<Opportunity, AppError> {
        self.users.require_manager(manager_id, tenant_id).await?;
        let (previous, opportunity) = self
            .crud
            .store()
            .change_manager(opportunity_id, tenant_id, manager_id)
            .await?;
        tracing::info!(opportunity_id = %opportunity_id, from = %previous, to = %manager_id, "Opportunity manager changed");
        Ok(opportunity)
    }

    /// Sum of expected revenue over active opportunities
    pub async fn total_expected_revenue(
        &self,
        tenant_id: &str,
        account_id: Option<&str>,
    ) -> Result<f64, AppError> {
        Ok(self
            .list(tenant_id, account_id)
            .await?
            .iter()
            .map(|o| o.expected_revenue)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crm_core::models::OpportunityStage;

    #[tokio::test]
    async fn test_list_filters_by_account_and_activity() {
        let fx = Fixture::new().await;
        let first = fx.account("Acme Corp").await;
        let second = fx.account("Acme Labs").await;
        fx.opportunity(&first, OpportunityStage::Prospecting, 500.0)
            .await;
        let dropped = fx
            .opportunity(&first, OpportunityStage::Qualification, 300.0)
            .await;
        fx.opportunity(&second, OpportunityStage::Committed, 100.0)
            .await;
        fx.opportunities
            .delete(&dropped.opportunity_id, &fx.tenant.tenant_id)
            .await
            .unwrap();

        let tenant = &fx.tenant.tenant_id;
        assert_eq!(fx.opportunities.list(tenant, None).await.unwrap().len(), 2);
        let for_first = fx
            .opportunities
            .list(tenant, Some(&first.account_id))
            .await
            .unwrap();
        assert_eq!(for_first.len(), 1);
        assert_eq!(for_first[0].expected_revenue, 500.0);

        assert_eq!(
            fx.opportunities
                .total_expected_revenue(tenant, None)
                .await
                .unwrap(),
            600.0
        );
        assert_eq!(
            fx.opportunities
                .total_expected_revenue(tenant, Some(&second.account_id))
                .await
                .unwrap(),
            100.0
        );
    }

    #[tokio::test]
    async fn test_account_must_belong_to_tenant() {
        let fx = Fixture::new().await;
        let other = fx.onboard("Globex", "boss@globex.test").await;
        let foreign = other
            .accounts
            .create(
                &other.tenant.tenant_id,
                crm_core::models::AccountCreate {
                    name: "Globex Corp".to_string(),
                    manager_id: other.admin.user_id.clone(),
                    tenant_id: None,
                },
            )
            .await
            .unwrap();

        let err = fx
            .opportunities
            .create(
                &fx.tenant.tenant_id,
                OpportunityCreate {
                    name: "Poach".to_string(),
                    account_id: foreign.account_id,
                    stage: OpportunityStage::Prospecting,
                    expected_revenue: 10.0,
                    manager_id: fx.admin.user_id.clone(),
                    tenant_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_is_merge_patch() {
        let fx = Fixture::new().await;
        let account = fx.account("Acme Corp").await;
        let created = fx
            .opportunity(&account, OpportunityStage::Prospecting, 1000.0)
            .await;

        let updated = fx
            .opportunities
            .update(
                &created.opportunity_id,
                &fx.tenant.tenant_id,
                OpportunityUpdate {
                    stage: Some(OpportunityStage::ClosedWon),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stage, OpportunityStage::ClosedWon);
        assert_eq!(updated.expected_revenue, 1000.0);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.account_id, created.account_id);
    }

    #[tokio::test]
    async fn test_change_manager_only_changes_owner() {
        let fx = Fixture::new().await;
        let account = fx.account("Acme Corp").await;
        let created = fx
            .opportunity(&account, OpportunityStage::Prospecting, 1000.0)
            .await;
        let rep = fx.member("rep@acme.test").await;

        let updated = fx
            .opportunities
            .change_manager(&created.opportunity_id, &fx.tenant.tenant_id, &rep.user_id)
            .await
            .unwrap();
        assert_eq!(updated.manager_id, rep.user_id);
        assert_eq!(updated.stage, created.stage);
        assert_eq!(updated.expected_revenue, created.expected_revenue);
    }
}
