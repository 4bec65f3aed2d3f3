//! Read-only analytics computed on demand over a tenant's active records.
//!
//! The aggregations are pure functions over slices so they can be reused and
//! tested without a store; [`AnalyticsService`] feeds them the current
//! snapshot of one tenant.

use std::collections::{BTreeMap, HashMap};

use crm_core::models::{
    Account, Opportunity, PipelineStage, StageDistribution, TenantSummary, TopAccount,
};
use crm_core::AppError;

use crate::{AccountService, OpportunityService};

pub const DEFAULT_TOP_ACCOUNTS_LIMIT: usize = 5;

pub fn tenant_summary(accounts: &[Account], opportunities: &[Opportunity]) -> TenantSummary {
    TenantSummary {
        total_accounts: accounts.len(),
        total_opportunities: opportunities.len(),
        total_expected_revenue: opportunities.iter().map(|o| o.expected_revenue).sum(),
    }
}

/// Stages without opportunities are omitted.
pub fn stage_distribution(opportunities: &[Opportunity]) -> StageDistribution {
    let mut distribution = StageDistribution::new();
    for opportunity in opportunities {
        *distribution.entry(opportunity.stage).or_insert(0) += 1;
    }
    distribution
}

/// Accounts ranked by the summed expected revenue of their opportunities.
///
/// Every account is ranked, including those without opportunities. Ties keep
/// the input order.
pub fn top_accounts_by_revenue(
    accounts: &[Account],
    opportunities: &[Opportunity],
    limit: usize,
) -> Vec<TopAccount> {
    let mut revenue_by_account: HashMap<&str, f64> = HashMap::new();
    for opportunity in opportunities {
        *revenue_by_account
            .entry(opportunity.account_id.as_str())
            .or_insert(0.0) += opportunity.expected_revenue;
    }

    let mut ranked: Vec<TopAccount> = accounts
        .iter()
        .map(|account| TopAccount {
            account_id: account.account_id.clone(),
            account_name: account.name.clone(),
            total_revenue: revenue_by_account
                .get(account.account_id.as_str())
                .copied()
                .unwrap_or(0.0),
        })
        .collect();
    ranked.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    ranked.truncate(limit);
    ranked
}

/// Count and revenue per stage, in pipeline order. Stages without opportunities are omitted.
pub fn sales_pipeline(opportunities: &[Opportunity]) -> Vec<PipelineStage> {
    let mut stages: BTreeMap<_, PipelineStage> = BTreeMap::new();
    for opportunity in opportunities {
        let entry = stages
            .entry(opportunity.stage)
            .or_insert_with(|| PipelineStage {
                stage: opportunity.stage,
                count: 0,
                total_expected_revenue: 0.0,
            });
        entry.count += 1;
        entry.total_expected_revenue += opportunity.expected_revenue;
    }
    stages.into_values().collect()
}

#[derive(Clone)]
pub struct AnalyticsService {
    accounts: AccountService,
    opportunities: OpportunityService,
}

impl AnalyticsService {
    pub fn new(accounts: AccountService, opportunities: OpportunityService) -> Self {
        Self {
            accounts,
            opportunities,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn tenant_summary(&self, tenant_id: &str) -> Result<TenantSummary, AppError> {
        let accounts = self.accounts.list(tenant_id).await?;
        let opportunities = self.opportunities.list(tenant_id, None).await?;
        Ok(tenant_summary(&accounts, &opportunities))
    }

    pub async fn stage_distribution(&self, tenant_id: &str) -> Result<StageDistribution, AppError> {
        let opportunities = self.opportunities.list(tenant_id, None).await?;
        Ok(stage_distribution(&opportunities))
    }

    pub async fn top_accounts_by_revenue(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<TopAccount>, AppError> {
        let accounts = self.accounts.list(tenant_id).await?;
        let opportunities = self.opportunities.list(tenant_id, None).await?;
        Ok(top_accounts_by_revenue(&accounts, &opportunities, limit))
    }

    pub async fn sales_pipeline(&self, tenant_id: &str) -> Result<Vec<PipelineStage>, AppError> {
        let opportunities = self.opportunities.list(tenant_id, None).await?;
        Ok(sales_pipeline(&opportunities))
    }
}
