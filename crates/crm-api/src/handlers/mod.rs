//! HTTP handlers, one module per resource.
//!
//! Every tenant-scoped handler takes the tenant from the resolved
//! [`crm_services::AuthContext`], never from the path, query or body.

pub mod accounts;
pub mod analytics;
pub mod auth;
pub mod onboarding;
pub mod opportunities;
pub mod root;
pub mod tenants;
pub mod users;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Body of the `change-manager` endpoints
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeManagerRequest {
    #[validate(length(min = 1))]
    pub manager_id: String,
}

/// Optional account filter for opportunity queries
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountFilterQuery {
    /// Only opportunities of this account
    pub account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopAccountsQuery {
    /// Number of accounts to return (1-100, default 5)
    pub limit: Option<usize>,
}

pub(crate) fn deleted(label: &str) -> crm_core::models::MessageResponse {
    crm_core::models::MessageResponse::new(format!("{} successfully deleted", label))
}
