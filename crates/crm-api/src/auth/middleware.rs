use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use crm_core::AppError;
use crm_services::AuthContextResolver;

use crate::auth::jwks::TokenVerifier;
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
    pub resolver: AuthContextResolver,
}

fn bearer_token(request: &Request) -> Result<String, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ));
    }
    Ok(token.trim().to_string())
}

async fn authenticate(
    auth_state: &AuthState,
    token: &str,
) -> Result<crm_services::AuthContext, AppError> {
    let claims = auth_state.verifier.verify_token(token).await?;
    auth_state.resolver.resolve(&claims).await
}

/// Verifies the bearer token and stores the caller's [`crm_services::AuthContext`]
/// in the request extensions.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Body is not Sync, so the token is copied out before any await.
    let token = bearer_token(&request);
    let context = match token {
        Ok(token) => authenticate(&auth_state, &token).await,
        Err(e) => Err(e),
    };

    match context {
        Ok(context) => {
            tracing::debug!(
                user_id = %context.user_id(),
                tenant_id = %context.tenant_id,
                role = %context.role.as_str(),
                "Authenticated request"
            );
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
