use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crm_core::models::MessageResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses((status = 200, description = "Welcome message", body = MessageResponse))
)]
pub async fn root() -> impl IntoResponse {
    Json(MessageResponse::new("Welcome to the Multi-tenant CRM SaaS API"))
}

/// Healthy when the record store answers a ping within the timeout.
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Record store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match tokio::time::timeout(HEALTH_TIMEOUT, state.backend.ping()).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                store: None,
            }),
        ),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    store: Some("unreachable".to_string()),
                }),
            )
        }
        Err(_) => {
            tracing::error!("Store health check timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    store: Some("timeout".to_string()),
                }),
            )
        }
    }
}
