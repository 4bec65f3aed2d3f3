//! Route configuration and setup

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::middleware::{request_id_middleware, RequestId};
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method, Request},
    routing::{get, post, put},
    Json, Router,
};
use crm_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = AuthState {
        verifier: state.verifier.clone(),
        resolver: state.resolver.clone(),
    };
    let prefix = config.api_v1_str.trim_end_matches('/');

    let public_routes = public_routes(prefix);
    let protected_routes = protected_routes(prefix).layer(
        axum::middleware::from_fn_with_state(Arc::new(auth_state), auth_middleware),
    );

    let openapi = crate::api_doc::get_openapi_spec(prefix);

    tracing::info!(
        api_prefix = %prefix,
        http_concurrency_limit = config.http_concurrency_limit,
        max_body_bytes = config.max_body_bytes,
        "Routes configured"
    );

    let app = public_routes
        .merge(protected_routes)
        .route(
            crate::constants::OPENAPI_PATH,
            get(move || {
                let spec = openapi.clone();
                async move { Json(spec) }
            }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new(crate::constants::OPENAPI_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn public_routes(prefix: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .route(
            &format!("{}/auth/register", prefix),
            post(handlers::auth::register),
        )
        .route(&format!("{}/auth/login", prefix), post(handlers::auth::login))
        .route(
            &format!("{}/auth/forgot-password", prefix),
            post(handlers::auth::forgot_password),
        )
        .route(
            &format!("{}/auth/reset-password", prefix),
            post(handlers::auth::reset_password),
        )
        .route(
            &format!("{}/onboarding/onboard", prefix),
            post(handlers::onboarding::onboard),
        )
}

fn protected_routes(prefix: &str) -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth_routes(prefix))
        .merge(tenant_routes(prefix))
        .merge(user_routes(prefix))
        .merge(account_routes(prefix))
        .merge(opportunity_routes(prefix))
        .merge(analytics_routes(prefix))
}

fn auth_routes(prefix: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/auth/logout", prefix), post(handlers::auth::logout))
        .route(
            &format!("{}/auth/change-password", prefix),
            post(handlers::auth::change_password),
        )
}

fn tenant_routes(prefix: &str) -> Router<Arc<AppState>> {
    use handlers::tenants;
    Router::new()
        .route(
            &format!("{}/tenants", prefix),
            post(tenants::create_tenant).get(tenants::list_tenants),
        )
        .route(
            &format!("{}/tenants/{{id}}", prefix),
            get(tenants::get_tenant)
                .put(tenants::update_tenant)
                .delete(tenants::delete_tenant),
        )
}

fn user_routes(prefix: &str) -> Router<Arc<AppState>> {
    use handlers::users;
    Router::new()
        .route(
            &format!("{}/users", prefix),
            post(users::create_user).get(users::list_users),
        )
        .route(
            &format!("{}/users/me", prefix),
            get(users::get_me).put(users::update_me),
        )
        .route(
            &format!("{}/users/{{id}}", prefix),
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

fn account_routes(prefix: &str) -> Router<Arc<AppState>> {
    use handlers::accounts;
    Router::new()
        .route(
            &format!("{}/accounts", prefix),
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route(
            &format!("{}/accounts/{{id}}", prefix),
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route(
            &format!("{}/accounts/{{id}}/change-manager", prefix),
            put(accounts::change_account_manager),
        )
}

fn opportunity_routes(prefix: &str) -> Router<Arc<AppState>> {
    use handlers::opportunities;
    Router::new()
        .route(
            &format!("{}/opportunities", prefix),
            post(opportunities::create_opportunity).get(opportunities::list_opportunities),
        )
        .route(
            &format!("{}/opportunities/total-expected-revenue", prefix),
            get(opportunities::total_expected_revenue),
        )
        .route(
            &format!("{}/opportunities/{{id}}", prefix),
            get(opportunities::get_opportunity)
                .put(opportunities::update_opportunity)
                .delete(opportunities::delete_opportunity),
        )
        .route(
            &format!("{}/opportunities/{{id}}/change-manager", prefix),
            put(opportunities::change_opportunity_manager),
        )
}

fn analytics_routes(prefix: &str) -> Router<Arc<AppState>> {
    use handlers::analytics;
    Router::new()
        .route(
            &format!("{}/analytics/tenant-summary", prefix),
            get(analytics::tenant_summary),
        )
        .route(
            &format!("{}/analytics/opportunity-stage-distribution", prefix),
            get(analytics::opportunity_stage_distribution),
        )
        .route(
            &format!("{}/analytics/top-accounts-by-revenue", prefix),
            get(analytics::top_accounts_by_revenue),
        )
        .route(
            &format!("{}/analytics/sales-pipeline", prefix),
            get(analytics::sales_pipeline),
        )
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid origin in ALLOWED_ORIGINS: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };
    Ok(cors)
}
