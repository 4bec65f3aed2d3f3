use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_core::models::{MessageResponse, User, UserCreate, UserSelfUpdate, UserUpdate};

use crate::auth::{ActiveUser, AdminUser};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Provision a user in the caller's tenant with the requested role.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request), fields(tenant_id = %ctx.tenant_id))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<UserCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let role = request.role;
    let user = state
        .onboarding
        .provision_user(&ctx.tenant_id, request, role)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Active users of the tenant", body = Vec<User>),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.users.list(&ctx.tenant_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses((status = 200, description = "The caller's user record", body = User)),
    security(("bearer_auth" = []))
)]
pub async fn get_me(ActiveUser(ctx): ActiveUser) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(ctx.user))
}

/// Self-service update. Only names can change.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UserSelfUpdate,
    responses((status = 200, description = "Updated user record", body = User)),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    ValidatedJson(update): ValidatedJson<UserSelfUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .users
        .update_self(ctx.user_id(), &ctx.tenant_id, update)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.users.get(&user_id, &ctx.tenant_id).await?))
}

/// Admin update; role and activity changes reach the identity backend too.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Path(user_id): Path<String>,
    ValidatedJson(update): ValidatedJson<UserUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state.users.update(&user_id, &ctx.tenant_id, update).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User soft-deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(ctx): AdminUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.users.delete(&user_id, &ctx.tenant_id).await?;
    Ok(Json(super::deleted("User")))
}
