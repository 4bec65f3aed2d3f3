use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::OpportunityStage;

/// Counts and revenue across a tenant's active records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TenantSummary {
    pub total_accounts: usize,
    pub total_opportunities: usize,
    pub total_expected_revenue: f64,
}

/// Stage label -> number of active opportunities in that stage
pub type StageDistribution = BTreeMap<OpportunityStage, usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopAccount {
    pub account_id: String,
    pub account_name: String,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineStage {
    pub stage: OpportunityStage,
    pub count: usize,
    pub total_expected_revenue: f64,
}
