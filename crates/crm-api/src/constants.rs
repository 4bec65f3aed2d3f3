//! API constants
//!
//! Handler path annotations use [`API_PREFIX`] literally (utoipa needs
//! compile-time paths). When `API_V1_STR` configures a different prefix, routes
//! are mounted there and the served OpenAPI document is rewritten to match.

/// Default versioned prefix for resource routes
pub const API_PREFIX: &str = "/api/v1";

/// Where the OpenAPI document is served
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Upper bound for the `limit` query parameter of the top accounts report
pub const MAX_TOP_ACCOUNTS: usize = 100;
