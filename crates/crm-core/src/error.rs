//! Error types module
//!
//! All failures in the CRM backend are unified under [`AppError`]. Each variant
//! self-describes how it is presented over HTTP through [`ErrorMetadata`], so
//! the API layer never needs to match on variants itself.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures or missing records
    Debug,
    /// Recoverable issues and authorization refusals worth noticing
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Identity backend error: {0}")]
    IdentityBackend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Inactive user")]
    InactiveUser,

    #[error("The user doesn't have enough privileges")]
    InsufficientPrivilege,

    #[error("{step} failed: {source}")]
    SagaFailed {
        step: String,
        #[source]
        source: Box<AppError>,
        compensation_errors: Vec<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StoreUnavailable(_) => (
            503,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::IdentityBackend(_) => (
            502,
            "IDENTITY_BACKEND_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Use a different identifier"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidSignature => (
            401,
            "INVALID_SIGNATURE",
            false,
            Some("Obtain a new token by logging in again"),
            false,
            LogLevel::Warn,
        ),
        AppError::TokenExpired => (
            401,
            "TOKEN_EXPIRED",
            false,
            Some("Obtain a new token by logging in again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InactiveUser => (
            400,
            "INACTIVE_USER",
            false,
            Some("Contact a tenant administrator to reactivate the account"),
            false,
            LogLevel::Debug,
        ),
        AppError::InsufficientPrivilege => (
            403,
            "INSUFFICIENT_PRIVILEGE",
            false,
            Some("This operation requires the admin role"),
            false,
            LogLevel::Warn,
        ),
        AppError::SagaFailed { source, .. } => app_error_static_metadata(source),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::IdentityBackend(_) => "IdentityBackend",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidSignature => "InvalidSignature",
            AppError::TokenExpired => "TokenExpired",
            AppError::InactiveUser => "InactiveUser",
            AppError::InsufficientPrivilege => "InsufficientPrivilege",
            AppError::SagaFailed { .. } => "SagaFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Shorthand for a missing entity of the given kind
    pub fn not_found(label: &str) -> Self {
        AppError::NotFound(format!("{} not found", label))
    }

    /// The failure that started a saga rollback, or `self` for any other variant
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::SagaFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        if let AppError::SagaFailed {
            compensation_errors,
            ..
        } = self
        {
            for failure in compensation_errors {
                details.push_str(&format!("\n  Compensation failed: {}", failure));
            }
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::StoreUnavailable(_) => "Data store is unavailable".to_string(),
            AppError::IdentityBackend(_) => "Identity provider request failed".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::InvalidSignature => "Token signature verification failed".to_string(),
            AppError::TokenExpired => "Token has expired".to_string(),
            AppError::InactiveUser => "Inactive user".to_string(),
            AppError::InsufficientPrivilege => {
                "The user doesn't have enough privileges".to_string()
            }
            AppError::SagaFailed {
                source,
                compensation_errors,
                ..
            } => {
                if compensation_errors.is_empty() {
                    source.client_message()
                } else {
                    format!(
                        "{} (cleanup incomplete after {} failed compensation step(s))",
                        source.client_message(),
                        compensation_errors.len()
                    )
                }
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_store_unavailable() {
        let err = AppError::StoreUnavailable("connection refused".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Data store is unavailable");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::not_found("Account");
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Account not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_authorization_taxonomy() {
        assert_eq!(AppError::InvalidSignature.http_status_code(), 401);
        assert_eq!(AppError::TokenExpired.http_status_code(), 401);
        assert_eq!(
            AppError::Unauthorized("missing".to_string()).http_status_code(),
            401
        );
        assert_eq!(AppError::InactiveUser.http_status_code(), 400);
        assert_eq!(AppError::InsufficientPrivilege.http_status_code(), 403);
        assert_eq!(
            AppError::InsufficientPrivilege.client_message(),
            "The user doesn't have enough privileges"
        );
    }

    #[test]
    fn test_saga_failure_reports_original_error() {
        let err = AppError::SagaFailed {
            step: "create_admin_user".to_string(),
            source: Box::new(AppError::Conflict("User already exists".to_string())),
            compensation_errors: vec!["delete_group: store unavailable".to_string()],
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(err.client_message().starts_with("User already exists"));
        assert!(err.client_message().contains("1 failed compensation"));
        assert!(err.detailed_message().contains("Compensation failed"));
        assert!(matches!(err.root_cause(), AppError::Conflict(_)));
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err1 = AppError::StoreUnavailable("test".to_string());
        assert_eq!(err1.suggested_action(), Some("Retry after a short delay"));

        let err2 = AppError::NotFound("test".to_string());
        assert_eq!(
            err2.suggested_action(),
            Some("Verify the resource ID exists")
        );

        let err3 = AppError::InvalidInput("test".to_string());
        assert_eq!(
            err3.suggested_action(),
            Some("Check request parameters and try again")
        );
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_sensitive());
    }
}
