//! Typed per-request authentication context.

use serde::Deserialize;
use validator::Validate;

use crate::db::User;

/// Signup/login request payload, checked by the payload validation stage.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: Option<String>,
}

/// Immutable request-scoped context built up by the interception pipeline.
///
/// Each stage returns a new context with its own field filled in; handlers
/// read the fields through the extractors in [`crate::auth::extract`]. Which
/// fields are present depends on which stages ran: the payload stage sets
/// `credentials`, the access-token stage sets `principal_id`, and the
/// refresh-token stage sets `principal` (it must load the full record to
/// check the custom key).
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    credentials: Option<Credentials>,
    principal_id: Option<String>,
    principal: Option<User>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self
        }
    }

    pub fn with_principal_id(self, principal_id: String) -> Self {
        Self {
            principal_id: Some(principal_id),
            ..self
        }
    }

    pub fn with_principal(self, principal: User) -> Self {
        Self {
            principal: Some(principal),
            ..self
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.principal_id.as_deref()
    }

    pub fn principal(&self) -> Option<&User> {
        self.principal.as_ref()
    }
}
