//! OpenAPI documentation.
//! Handler annotations use the default `/api/v1` prefix (utoipa requires
//! compile-time literals); the served document is rewritten to the configured one.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::constants::API_PREFIX;
use crate::error;
use crate::handlers;
use crm_core::models;

/// Replace the compile-time prefix in every path key with `prefix`.
fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, prefix: &str) {
    if prefix == API_PREFIX {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = match key.strip_prefix(API_PREFIX) {
            Some(rest) => format!("{}{}", prefix, rest),
            None => key,
        };
        spec.paths.paths.insert(new_key, item);
    }
}

/// The OpenAPI document with paths under `prefix`.
pub fn get_openapi_spec(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, prefix);
    spec
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Multi-tenant CRM SaaS API",
        version = "0.1.0",
        description = "Tenant-isolated accounts, opportunities and users with analytics. Resource endpoints live under /api/v1/ and take a bearer token."
    ),
    paths(
        // Service
        handlers::root::root,
        handlers::root::health,
        // Auth
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::change_password,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        // Onboarding
        handlers::onboarding::onboard,
        // Tenants
        handlers::tenants::create_tenant,
        handlers::tenants::list_tenants,
        handlers::tenants::get_tenant,
        handlers::tenants::update_tenant,
        handlers::tenants::delete_tenant,
        // Users
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        // Accounts
        handlers::accounts::create_account,
        handlers::accounts::list_accounts,
        handlers::accounts::get_account,
        handlers::accounts::update_account,
        handlers::accounts::delete_account,
        handlers::accounts::change_account_manager,
        // Opportunities
        handlers::opportunities::create_opportunity,
        handlers::opportunities::list_opportunities,
        handlers::opportunities::total_expected_revenue,
        handlers::opportunities::get_opportunity,
        handlers::opportunities::update_opportunity,
        handlers::opportunities::delete_opportunity,
        handlers::opportunities::change_opportunity_manager,
        // Analytics
        handlers::analytics::tenant_summary,
        handlers::analytics::opportunity_stage_distribution,
        handlers::analytics::top_accounts_by_revenue,
        handlers::analytics::sales_pipeline,
    ),
    components(
        schemas(
            models::Tenant,
            models::TenantCreate,
            models::TenantUpdate,
            models::User,
            models::UserRole,
            models::UserCreate,
            models::UserUpdate,
            models::UserSelfUpdate,
            models::Account,
            models::AccountCreate,
            models::AccountUpdate,
            models::Opportunity,
            models::OpportunityStage,
            models::OpportunityCreate,
            models::OpportunityUpdate,
            models::TenantSummary,
            models::TopAccount,
            models::PipelineStage,
            models::OnboardingRequest,
            models::OnboardingResponse,
            models::RegisterRequest,
            models::LoginForm,
            models::TokenResponse,
            models::ChangePasswordRequest,
            models::ForgotPasswordRequest,
            models::ResetPasswordRequest,
            models::MessageResponse,
            handlers::ChangeManagerRequest,
            handlers::opportunities::TotalExpectedRevenue,
            handlers::root::HealthResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "service", description = "Welcome message and health check"),
        (name = "auth", description = "Registration, login and password lifecycle"),
        (name = "onboarding", description = "Tenant onboarding with its first admin"),
        (name = "tenants", description = "Tenant administration (admin only)"),
        (name = "users", description = "User administration and self-service profile"),
        (name = "accounts", description = "Customer accounts"),
        (name = "opportunities", description = "Sales opportunities"),
        (name = "analytics", description = "Tenant-level sales analytics")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix_is_untouched() {
        let spec = get_openapi_spec(API_PREFIX);
        assert!(spec.paths.paths.contains_key("/api/v1/accounts"));
        assert!(spec.paths.paths.contains_key("/health"));
    }

    #[test]
    fn test_custom_prefix_rewrites_resource_paths() {
        let spec = get_openapi_spec("/crm/v2");
        assert!(spec.paths.paths.contains_key("/crm/v2/accounts/{id}"));
        assert!(!spec.paths.paths.contains_key("/api/v1/accounts/{id}"));
        assert!(spec.paths.paths.contains_key("/"));
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
