//! User account API endpoints.
//!
//! - POST `/signup` - Create an account (behind the payload validation stage)
//! - POST `/login` - Issue access + refresh tokens (behind payload validation)
//! - GET `/greet` - Sample protected endpoint (behind the access-token stage)
//! - POST `/logout` - Rotate the token secret, invalidating all refresh
//!   tokens (behind the refresh-token stage)

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    AccessTokenStage, AuthService, CurrentPrincipal, CurrentPrincipalId, PayloadValidationStage,
    Pipeline, RefreshTokenStage, ValidCredentials, pipeline_middleware,
};
use crate::db::Database;
use crate::response::GenericResponse;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub auth: Arc<AuthService>,
}

pub fn router(state: UsersState) -> Router {
    let payload_guard = Pipeline::new(vec![Box::new(PayloadValidationStage)]);
    let access_guard = Pipeline::new(vec![Box::new(AccessTokenStage::new(state.auth.clone()))]);
    let refresh_guard = Pipeline::new(vec![Box::new(RefreshTokenStage::new(
        state.auth.clone(),
        state.db.clone(),
    ))]);

    let credential_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .layer(middleware::from_fn(pipeline_middleware(payload_guard)));

    let access_routes = Router::new()
        .route("/greet", get(greet))
        .layer(middleware::from_fn(pipeline_middleware(access_guard)));

    let refresh_routes = Router::new()
        .route("/logout", post(logout))
        .layer(middleware::from_fn(pipeline_middleware(refresh_guard)));

    Router::new()
        .merge(credential_routes)
        .merge(access_routes)
        .merge(refresh_routes)
        .with_state(state)
}

/// Generate a fresh random token secret for a user.
fn generate_token_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a new account with a hashed password and a fresh token secret.
async fn signup(
    State(state): State<UsersState>,
    ValidCredentials(credentials): ValidCredentials,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .db
        .users()
        .get_by_email(&credentials.email)
        .await
        .db_err("Failed to check existing user")?;
    if existing.is_some() {
        return Err(ApiError::bad_request(
            "User already exists with the given email",
        ));
    }

    let password_hash = bcrypt::hash(&credentials.password, bcrypt::DEFAULT_COST).map_err(|e| {
        error!(error = %e, "failed to hash password");
        ApiError::internal("Failed to create user")
    })?;

    let uuid = Uuid::new_v4().to_string();
    let token_secret = generate_token_secret();
    let username = credentials.username.unwrap_or_default();

    state
        .db
        .users()
        .create(
            &uuid,
            &credentials.email,
            &username,
            &password_hash,
            &token_secret,
        )
        .await
        .db_err("Failed to create user")?;

    info!(user_uuid = %uuid, "user created");
    Ok(Json(GenericResponse::ok("User created successfully")))
}

/// Verify the password and issue an access + refresh token pair.
async fn login(
    State(state): State<UsersState>,
    ValidCredentials(credentials): ValidCredentials,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(&credentials.email)
        .await
        .db_err("Failed to fetch user")?
        .ok_or_else(|| {
            warn!("login attempt for unknown email");
            ApiError::bad_request("Incorrect credentials")
        })?;

    let password_ok = bcrypt::verify(&credentials.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "failed to verify password");
        ApiError::internal("Failed to log in")
    })?;
    if !password_ok {
        warn!(user_uuid = %user.uuid, "login with wrong password");
        return Err(ApiError::bad_request("Incorrect credentials"));
    }

    let access = state
        .auth
        .codec()
        .generate_access_token(&user.uuid)
        .map_err(|e| {
            error!(error = %e, "failed to generate access token");
            ApiError::internal("Failed to log in")
        })?;

    let custom_key = state
        .auth
        .generate_custom_key(&user.uuid, &user.token_secret);
    let refresh = state
        .auth
        .codec()
        .generate_refresh_token(&user.uuid, &custom_key)
        .map_err(|e| {
            error!(error = %e, "failed to generate refresh token");
            ApiError::internal("Failed to log in")
        })?;

    info!(user_uuid = %user.uuid, "user logged in");
    Ok(Json(GenericResponse::ok_with_data(
        "Successfully logged in",
        json!({
            "access_token": access.token,
            "refresh_token": refresh.token,
            "expires_in": access.duration,
            "username": user.username,
        }),
    )))
}

/// Sample endpoint behind the access-token stage.
async fn greet(CurrentPrincipalId(user_uuid): CurrentPrincipalId) -> impl IntoResponse {
    Json(GenericResponse::ok(format!("Hello, {}", user_uuid)))
}

/// Rotate the token secret so every outstanding refresh token stops
/// validating.
async fn logout(
    State(state): State<UsersState>,
    CurrentPrincipal(user): CurrentPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let token_secret = generate_token_secret();
    state
        .db
        .users()
        .rotate_token_secret(&user.uuid, &token_secret)
        .await
        .db_err("Failed to rotate token secret")?;

    info!(user_uuid = %user.uuid, "token secret rotated");
    Ok(Json(GenericResponse::ok("Logged out from all devices")))
}
