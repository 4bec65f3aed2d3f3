//! Token claims, key sets and auth request/response bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::UserRole;
use crate::AppError;

/// Claims as they appear inside a signed token.
///
/// Tenant, role and activity travel as `custom:` attributes so tokens from a
/// Cognito-style user pool verify unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "custom:tenant_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant_id: Option<String>,
    #[serde(rename = "custom:role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// String `"true"`/`"false"` on the wire; booleans are tolerated
    #[serde(
        rename = "custom:is_active",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_active: Option<serde_json::Value>,
    #[serde(
        rename = "custom:session",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session: Option<u64>,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Verified identity facts extracted from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub tenant_id: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email: Option<String>,
    pub session: Option<u64>,
    pub expires_at: i64,
}

impl TryFrom<TokenClaims> for Claims {
    type Error = AppError;

    fn try_from(raw: TokenClaims) -> Result<Self, Self::Error> {
        let tenant_id = raw
            .tenant_id
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid authentication credentials".into()))?;
        if raw.sub.is_empty() {
            return Err(AppError::Unauthorized(
                "Invalid authentication credentials".into(),
            ));
        }

        let is_active = match raw.is_active {
            None => true,
            Some(serde_json::Value::Bool(flag)) => flag,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(_) => false,
        };

        Ok(Claims {
            user_id: raw.sub,
            tenant_id,
            role: raw
                .role
                .as_deref()
                .map(UserRole::from_claim)
                .unwrap_or_default(),
            is_active,
            email: raw.email,
            session: raw.session,
            expires_at: raw.exp,
        })
    }
}

/// JWKS (JSON Web Key Set) structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// JSON Web Key structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(rename = "alg", default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<String>, // For RSA
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub exponent: Option<String>, // For RSA
    #[serde(rename = "x", default, skip_serializing_if = "Option::is_none")]
    pub x_coordinate: Option<String>, // For EC
    #[serde(rename = "y", default, skip_serializing_if = "Option::is_none")]
    pub y_coordinate: Option<String>, // For EC
    #[serde(rename = "crv", default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>, // For EC
    #[serde(rename = "k", default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>, // For oct
}

/// OAuth2 password-grant style login form
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    #[validate(length(min = 8, max = 256))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 8, max = 256))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
