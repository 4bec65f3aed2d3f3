//! Authentication handlers
//!
//! Registration, login and the password lifecycle are delegated to the
//! identity backend through [`crm_services::AuthService`].

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use crm_core::models::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginForm, MessageResponse, RegisterRequest,
    ResetPasswordRequest, TokenResponse, User,
};
use crm_core::AppError;

use crate::auth::{ActiveUser, CurrentUser};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Register a user in an existing, active tenant. The role is always `user`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input or inactive tenant", body = ErrorResponse),
        (status = 404, description = "Tenant not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(tenant_id = %request.tenant_id))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a bearer token (OAuth2 password form).
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, form))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Form(form) = form?;
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::InvalidInput("username and password are required".to_string()).into());
    }
    let token = state.auth.login(form).await?;
    Ok(Json(token))
}

/// Revoke every token issued to the caller.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(ctx): CurrentUser,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.logout(ctx.user_id()).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Incorrect old password, invalid input or inactive user", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    ActiveUser(ctx): ActiveUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.change_password(ctx.user_id(), request).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Start a password reset. Answers the same way whether or not the address is known.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset code sent if the account exists", body = MessageResponse))
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.forgot_password(&request.email).await?;
    Ok(Json(MessageResponse::new(
        "If the account exists, a password reset code has been sent",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.reset_password(request).await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}
