use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_core::models::{MessageResponse, Opportunity, OpportunityCreate, OpportunityUpdate};
use serde::Serialize;
use utoipa::ToSchema;

use super::{AccountFilterQuery, ChangeManagerRequest};
use crate::auth::ActiveUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TotalExpectedRevenue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub total_expected_revenue: f64,
}

/// Create an opportunity on an active account of the caller's tenant.
#[utoipa::path(
    post,
    path = "/api/v1/opportunities",
    tag = "opportunities",
    request_body = OpportunityCreate,
    responses(
        (status = 201, description = "Opportunity created", body = Opportunity),
        (status = 400, description = "Unknown account or manager", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request), fields(tenant_id = %ctx.tenant_id, account_id = %request.account_id))]
pub async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    ValidatedJson(request): ValidatedJson<OpportunityCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let opportunity = state.opportunities.create(&ctx.tenant_id, request).await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities",
    tag = "opportunities",
    params(AccountFilterQuery),
    responses((status = 200, description = "Active opportunities", body = Vec<Opportunity>)),
    security(("bearer_auth" = []))
)]
pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Query(query): Query<AccountFilterQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let opportunities = state
        .opportunities
        .list(&ctx.tenant_id, query.account_id.as_deref())
        .await?;
    Ok(Json(opportunities))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/total-expected-revenue",
    tag = "opportunities",
    params(AccountFilterQuery),
    responses((status = 200, description = "Sum of expected revenue over active opportunities", body = TotalExpectedRevenue)),
    security(("bearer_auth" = []))
)]
pub async fn total_expected_revenue(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Query(query): Query<AccountFilterQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let total = state
        .opportunities
        .total_expected_revenue(&ctx.tenant_id, query.account_id.as_deref())
        .await?;
    Ok(Json(TotalExpectedRevenue {
        account_id: query.account_id,
        total_expected_revenue: total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Opportunity", body = Opportunity),
        (status = 404, description = "Opportunity not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_opportunity(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(opportunity_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state.opportunities.get(&opportunity_id, &ctx.tenant_id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    request_body = OpportunityUpdate,
    responses(
        (status = 200, description = "Opportunity updated", body = Opportunity),
        (status = 404, description = "Opportunity not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_opportunity(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(opportunity_id): Path<String>,
    ValidatedJson(update): ValidatedJson<OpportunityUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let opportunity = state
        .opportunities
        .update(&opportunity_id, &ctx.tenant_id, update)
        .await?;
    Ok(Json(opportunity))
}

#[utoipa::path(
    delete,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Opportunity soft-deleted", body = MessageResponse),
        (status = 404, description = "Opportunity not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_opportunity(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(opportunity_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .opportunities
        .delete(&opportunity_id, &ctx.tenant_id)
        .await?;
    Ok(Json(super::deleted("Opportunity")))
}

#[utoipa::path(
    put,
    path = "/api/v1/opportunities/{id}/change-manager",
    tag = "opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    request_body = ChangeManagerRequest,
    responses(
        (status = 200, description = "Manager reassigned", body = Opportunity),
        (status = 404, description = "Opportunity not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_opportunity_manager(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(opportunity_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeManagerRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let opportunity = state
        .opportunities
        .change_manager(&opportunity_id, &ctx.tenant_id, &request.manager_id)
        .await?;
    Ok(Json(opportunity))
}
