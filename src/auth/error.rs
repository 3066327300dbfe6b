//! Authentication failure taxonomy.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response::GenericResponse;

/// Why an authentication attempt was rejected.
///
/// The variant is for operator-facing logs; callers only ever see the
/// caller-safe message below. Every failure terminates the current request
/// with HTTP 400 and is never retried.
#[derive(Debug)]
pub enum AuthFailure {
    /// Request body was not decodable JSON. Carries the decode error text,
    /// which is echoed to the caller.
    MalformedRequest(String),
    /// Body decoded but failed field validation. Carries the per-field
    /// messages, joined by comma on the wire.
    ValidationFailed(Vec<String>),
    /// Authorization header absent or not exactly two space-separated parts.
    MissingOrMalformedToken,
    /// Token failed signature, expiry, or class checks.
    InvalidToken,
    /// Token subject does not resolve to a stored user.
    PrincipalNotFound,
    /// Refresh token's embedded custom key does not match the key derived
    /// from the user's current token secret (e.g. after rotation).
    KeyMismatch,
}

impl AuthFailure {
    /// Caller-safe message. Token failures deliberately share wording so the
    /// response does not reveal which check failed.
    pub fn message(&self) -> String {
        match self {
            AuthFailure::MalformedRequest(detail) => detail.clone(),
            AuthFailure::ValidationFailed(messages) => messages.join(","),
            AuthFailure::MissingOrMalformedToken => {
                "Authentication failed. Token not provided or malformed".to_string()
            }
            AuthFailure::InvalidToken | AuthFailure::KeyMismatch => {
                "Authentication failed. Invalid token".to_string()
            }
            AuthFailure::PrincipalNotFound => "Unable to fetch corresponding user".to_string(),
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(GenericResponse::err(self.message())),
        )
            .into_response()
    }
}
