//! Handler-side access to the authenticated caller.
//!
//! [`CurrentUser`] accepts any authenticated caller, [`ActiveUser`] rejects
//! inactive ones with 400, and [`AdminUser`] additionally requires the admin
//! role (403 otherwise).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crm_core::AppError;
use crm_services::AuthContext;

use crate::error::HttpAppError;

fn context(parts: &Parts) -> Result<AuthContext, HttpAppError> {
    parts
        .extensions
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| HttpAppError(AppError::Unauthorized("Not authenticated".to_string())))
}

#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        context(parts).map(CurrentUser)
    }
}

#[derive(Debug, Clone)]
pub struct ActiveUser(pub AuthContext);

impl<S> FromRequestParts<S> for ActiveUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = context(parts)?;
        ctx.require_active()?;
        Ok(ActiveUser(ctx))
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthContext);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = context(parts)?;
        ctx.require_admin()?;
        Ok(AdminUser(ctx))
    }
}
