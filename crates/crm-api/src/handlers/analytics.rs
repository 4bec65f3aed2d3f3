//! Tenant analytics over active accounts and opportunities.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use crm_core::models::{PipelineStage, TenantSummary, TopAccount};
use crm_core::AppError;
use crm_services::analytics::DEFAULT_TOP_ACCOUNTS_LIMIT;

use super::TopAccountsQuery;
use crate::auth::ActiveUser;
use crate::constants::MAX_TOP_ACCOUNTS;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/analytics/tenant-summary",
    tag = "analytics",
    responses((status = 200, description = "Account and opportunity totals", body = TenantSummary)),
    security(("bearer_auth" = []))
)]
pub async fn tenant_summary(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.analytics.tenant_summary(&ctx.tenant_id).await?))
}

/// Opportunity count per stage
#[utoipa::path(
    get,
    path = "/api/v1/analytics/opportunity-stage-distribution",
    tag = "analytics",
    responses((status = 200, description = "Count of opportunities per stage", body = BTreeMap<String, usize>)),
    security(("bearer_auth" = []))
)]
pub async fn opportunity_stage_distribution(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state.analytics.stage_distribution(&ctx.tenant_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/top-accounts-by-revenue",
    tag = "analytics",
    params(TopAccountsQuery),
    responses(
        (status = 200, description = "Accounts ranked by expected revenue", body = Vec<TopAccount>),
        (status = 400, description = "limit out of range", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn top_accounts_by_revenue(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Query(query): Query<TopAccountsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_ACCOUNTS_LIMIT);
    if !(1..=MAX_TOP_ACCOUNTS).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_TOP_ACCOUNTS
        ))
        .into());
    }
    let accounts = state
        .analytics
        .top_accounts_by_revenue(&ctx.tenant_id, limit)
        .await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/sales-pipeline",
    tag = "analytics",
    responses((status = 200, description = "Count and expected revenue per stage", body = Vec<PipelineStage>)),
    security(("bearer_auth" = []))
)]
pub async fn sales_pipeline(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.analytics.sales_pipeline(&ctx.tenant_id).await?))
}
