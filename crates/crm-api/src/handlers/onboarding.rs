use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crm_core::models::{OnboardingRequest, OnboardingResponse};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Create a tenant together with its first admin.
///
/// Runs as a saga: if any step fails, the steps already taken are undone in
/// reverse order and the original failure is reported.
#[utoipa::path(
    post,
    path = "/api/v1/onboarding/onboard",
    tag = "onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 201, description = "Tenant and admin created", body = OnboardingResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Admin email already registered", body = ErrorResponse),
        (status = 500, description = "Onboarding failed and was rolled back", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(tenant_name = %request.tenant.name))]
pub async fn onboard(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<OnboardingRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.onboarding.onboard(request).await?;
    tracing::info!(
        tenant_id = %response.tenant.tenant_id,
        admin_id = %response.admin.user_id,
        "Tenant onboarded"
    );
    Ok((StatusCode::CREATED, Json(response)))
}
