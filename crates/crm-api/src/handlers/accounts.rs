use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_core::models::{Account, AccountCreate, AccountUpdate, MessageResponse};

use super::ChangeManagerRequest;
use crate::auth::ActiveUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Create an account. Any `tenant_id` in the body is ignored.
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Manager is not an active user of the tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request), fields(tenant_id = %ctx.tenant_id))]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    ValidatedJson(request): ValidatedJson<AccountCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request
        .tenant_id
        .as_deref()
        .is_some_and(|claimed| claimed != ctx.tenant_id)
    {
        tracing::warn!("Ignoring tenant_id supplied in request body");
    }
    let account = state.accounts.create(&ctx.tenant_id, request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "accounts",
    responses((status = 200, description = "Active accounts of the tenant", body = Vec<Account>)),
    security(("bearer_auth" = []))
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.accounts.list(&ctx.tenant_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.accounts.get(&account_id, &ctx.tenant_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, description = "Account id")),
    request_body = AccountUpdate,
    responses(
        (status = 200, description = "Account updated", body = Account),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(account_id): Path<String>,
    ValidatedJson(update): ValidatedJson<AccountUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let account = state
        .accounts
        .update(&account_id, &ctx.tenant_id, update)
        .await?;
    Ok(Json(account))
}

#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account soft-deleted", body = MessageResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.accounts.delete(&account_id, &ctx.tenant_id).await?;
    Ok(Json(super::deleted("Account")))
}

#[utoipa::path(
    put,
    path = "/api/v1/accounts/{id}/change-manager",
    tag = "accounts",
    params(("id" = String, Path, description = "Account id")),
    request_body = ChangeManagerRequest,
    responses(
        (status = 200, description = "Manager reassigned", body = Account),
        (status = 400, description = "Manager is not an active user of the tenant", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_account_manager(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    Path(account_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeManagerRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let account = state
        .accounts
        .change_manager(&account_id, &ctx.tenant_id, &request.manager_id)
        .await?;
    Ok(Json(account))
}
