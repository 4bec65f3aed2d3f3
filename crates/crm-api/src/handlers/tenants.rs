//! Tenant administration
//!
//! Tenants are the top-level partition, so these operations are not
//! tenant-scoped: any active admin may list and manage every tenant. The
//! records a tenant owns (users, accounts, opportunities) stay reachable only
//! from inside that tenant.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_core::models::{MessageResponse, Tenant, TenantCreate, TenantUpdate};

use crate::auth::AdminUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    tag = "tenants",
    request_body = TenantCreate,
    responses(
        (status = 201, description = "Tenant created", body = Tenant),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request))]
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<TenantCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.create(request).await?;
    tracing::info!(tenant_id = %tenant.tenant_id, created_by = %ctx.user_id(), "Tenant created");
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// Every active tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "Tenants", body = Vec<Tenant>),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
    AdminUser(_ctx): AdminUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.tenants.list_all().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 404, description = "Tenant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    AdminUser(_ctx): AdminUser,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.tenants.get(&tenant_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id")),
    request_body = TenantUpdate,
    responses(
        (status = 200, description = "Tenant updated", body = Tenant),
        (status = 404, description = "Tenant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_tenant(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Path(tenant_id): Path<String>,
    ValidatedJson(update): ValidatedJson<TenantUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.update(&tenant_id, update).await?;
    tracing::info!(tenant_id = %tenant_id, updated_by = %ctx.user_id(), "Tenant updated");
    Ok(Json(tenant))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Tenant soft-deleted", body = MessageResponse),
        (status = 404, description = "Tenant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.tenants.delete(&tenant_id).await?;
    tracing::info!(tenant_id = %tenant_id, deleted_by = %ctx.user_id(), "Tenant deleted");
    Ok(Json(super::deleted("Tenant")))
}
