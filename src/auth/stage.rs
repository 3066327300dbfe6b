//! The request-interception pipeline.
//!
//! Authentication is composed from ordered [`Stage`]s rather than nested
//! closures: each stage inspects the request and either rejects it or
//! forwards an enriched [`AuthContext`]. A [`Pipeline`] runs its stages front
//! to back and short-circuits on the first rejection, so ordering and
//! short-circuit behavior are plain data and each stage is testable on its
//! own.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use tracing::{debug, error, warn};
use validator::Validate;

use super::context::{AuthContext, Credentials};
use super::error::AuthFailure;
use super::service::AuthService;
use crate::db::Database;

/// Largest request body the pipeline will buffer.
const BODY_LIMIT: usize = 1024 * 1024;

/// Result of applying one stage to a request.
pub enum StageOutcome {
    /// Continue to the next stage (or the handler) with this context.
    Forward(AuthContext),
    /// Stop; respond with this failure. Later stages never run.
    Reject(AuthFailure),
}

/// One interception stage: a request transform over the immutable parts and
/// buffered body, producing a rejected response or an enriched context.
pub trait Stage: Send + Sync {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    fn apply<'a>(
        &'a self,
        parts: &'a Parts,
        body: &'a [u8],
        cx: AuthContext,
    ) -> BoxFuture<'a, StageOutcome>;
}

/// Pull the bearer token out of the Authorization header.
///
/// The header must split on single spaces into exactly two segments; the
/// scheme word itself is not inspected. Anything else counts as malformed,
/// including a missing header.
pub fn extract_bearer_token(parts: &Parts) -> Result<&str, AuthFailure> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let segments: Vec<&str> = header.split(' ').collect();
    if segments.len() != 2 {
        return Err(AuthFailure::MissingOrMalformedToken);
    }
    Ok(segments[1])
}

/// Decodes the request body as JSON credentials and runs field validation.
pub struct PayloadValidationStage;

impl Stage for PayloadValidationStage {
    fn name(&self) -> &'static str {
        "payload_validation"
    }

    fn apply<'a>(
        &'a self,
        _parts: &'a Parts,
        body: &'a [u8],
        cx: AuthContext,
    ) -> BoxFuture<'a, StageOutcome> {
        Box::pin(async move {
            let credentials: Credentials = match serde_json::from_slice(body) {
                Ok(credentials) => credentials,
                Err(e) => {
                    error!(error = %e, "deserialization of credentials failed");
                    return StageOutcome::Reject(AuthFailure::MalformedRequest(e.to_string()));
                }
            };

            if let Err(errors) = credentials.validate() {
                let messages = validation_messages(&errors);
                error!(errors = ?messages, "validation of credentials failed");
                return StageOutcome::Reject(AuthFailure::ValidationFailed(messages));
            }

            StageOutcome::Forward(cx.with_credentials(credentials))
        })
    }
}

/// Flatten validator output into per-field messages, sorted for stable wire
/// output.
fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages
}

/// Verifies the bearer access token and records the subject UUID.
pub struct AccessTokenStage {
    auth: Arc<AuthService>,
}

impl AccessTokenStage {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl Stage for AccessTokenStage {
    fn name(&self) -> &'static str {
        "access_token"
    }

    fn apply<'a>(
        &'a self,
        parts: &'a Parts,
        _body: &'a [u8],
        cx: AuthContext,
    ) -> BoxFuture<'a, StageOutcome> {
        Box::pin(async move {
            let token = match extract_bearer_token(parts) {
                Ok(token) => token,
                Err(failure) => {
                    warn!("access token not provided or malformed");
                    return StageOutcome::Reject(failure);
                }
            };

            match self.auth.validate_access_token(token) {
                Ok(user_uuid) => {
                    debug!("access token validated");
                    StageOutcome::Forward(cx.with_principal_id(user_uuid))
                }
                Err(failure) => {
                    warn!("access token validation failed");
                    StageOutcome::Reject(failure)
                }
            }
        })
    }
}

/// Verifies the bearer refresh token, loads the subject user, and checks the
/// embedded custom key against the user's current token secret.
pub struct RefreshTokenStage {
    auth: Arc<AuthService>,
    db: Database,
}

impl RefreshTokenStage {
    pub fn new(auth: Arc<AuthService>, db: Database) -> Self {
        Self { auth, db }
    }
}

impl Stage for RefreshTokenStage {
    fn name(&self) -> &'static str {
        "refresh_token"
    }

    fn apply<'a>(
        &'a self,
        parts: &'a Parts,
        _body: &'a [u8],
        cx: AuthContext,
    ) -> BoxFuture<'a, StageOutcome> {
        Box::pin(async move {
            let token = match extract_bearer_token(parts) {
                Ok(token) => token,
                Err(failure) => {
                    warn!("refresh token not provided or malformed");
                    return StageOutcome::Reject(failure);
                }
            };

            let (user_uuid, embedded_key) = match self.auth.validate_refresh_token(token) {
                Ok(decoded) => decoded,
                Err(failure) => {
                    warn!("refresh token validation failed");
                    return StageOutcome::Reject(failure);
                }
            };

            let user = match self.db.users().get_by_uuid(&user_uuid).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    error!(user_uuid = %user_uuid, "refresh token subject not found");
                    return StageOutcome::Reject(AuthFailure::PrincipalNotFound);
                }
                Err(e) => {
                    error!(error = %e, "failed to fetch user for refresh token");
                    return StageOutcome::Reject(AuthFailure::PrincipalNotFound);
                }
            };

            let actual_key = self
                .auth
                .generate_custom_key(&user.uuid, &user.token_secret);
            if embedded_key != actual_key {
                warn!(user_uuid = %user.uuid, "refresh token custom key mismatch");
                return StageOutcome::Reject(AuthFailure::KeyMismatch);
            }

            debug!("refresh token validated");
            StageOutcome::Forward(cx.with_principal(user))
        })
    }
}

/// An ordered list of stages run front to back over each request.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Run every stage in order, threading the context through. The first
    /// rejection wins and later stages never run.
    pub async fn run(&self, parts: &Parts, body: &[u8]) -> Result<AuthContext, AuthFailure> {
        let mut cx = AuthContext::new();
        for stage in &self.stages {
            match stage.apply(parts, body, cx).await {
                StageOutcome::Forward(next) => cx = next,
                StageOutcome::Reject(failure) => {
                    debug!(stage = stage.name(), "pipeline rejected request");
                    return Err(failure);
                }
            }
        }
        Ok(cx)
    }

    /// Run the pipeline against an axum request: buffer the body for the
    /// stages, then restore it and attach the context for the inner handler.
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        let (parts, body) = request.into_parts();

        let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to read request body");
                return AuthFailure::MalformedRequest(e.to_string()).into_response();
            }
        };

        match self.run(&parts, &bytes).await {
            Ok(cx) => {
                let mut request = Request::from_parts(parts, Body::from(bytes));
                request.extensions_mut().insert(cx);
                next.run(request).await
            }
            Err(failure) => failure.into_response(),
        }
    }
}

/// Adapt a pipeline into a function usable with `axum::middleware::from_fn`.
pub fn pipeline_middleware(
    pipeline: Pipeline,
) -> impl Fn(Request, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    let pipeline = Arc::new(pipeline);
    move |request: Request, next: Next| {
        let pipeline = pipeline.clone();
        Box::pin(async move { pipeline.handle(request, next).await })
    }
}
