//! Axum extractors for reading the pipeline's context in handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::error;

use super::context::{AuthContext, Credentials};
use super::error::AuthFailure;
use crate::db::User;

/// The subject UUID recorded by the access-token stage.
pub struct CurrentPrincipalId(pub String);

impl<S> FromRequestParts<S> for CurrentPrincipalId
where
    S: Send + Sync,
{
    type Rejection = AuthFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_context(parts)?
            .principal_id()
            .map(|id| CurrentPrincipalId(id.to_string()))
            .ok_or_else(missing_context)
    }
}

/// The full user record loaded by the refresh-token stage.
pub struct CurrentPrincipal(pub User);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_context(parts)?
            .principal()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(missing_context)
    }
}

/// The payload decoded and checked by the validation stage.
pub struct ValidCredentials(pub Credentials);

impl<S> FromRequestParts<S> for ValidCredentials
where
    S: Send + Sync,
{
    type Rejection = AuthFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_context(parts)?
            .credentials()
            .cloned()
            .map(ValidCredentials)
            .ok_or_else(missing_context)
    }
}

fn auth_context(parts: &Parts) -> Result<&AuthContext, AuthFailure> {
    parts
        .extensions
        .get::<AuthContext>()
        .ok_or_else(missing_context)
}

/// A handler asked for context its route's pipeline never produced. This is
/// a wiring bug, but the caller still only sees the generic message.
fn missing_context() -> AuthFailure {
    error!("auth context missing: route is not behind the required stage");
    AuthFailure::InvalidToken
}
