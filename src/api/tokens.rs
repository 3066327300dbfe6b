//! Token refresh API endpoint.
//!
//! - GET `/refresh-token` - Exchange a refresh token for a new access token
//!   (behind the refresh-token stage)

use axum::{Json, Router, extract::State, middleware, response::IntoResponse, routing::get};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::error::ApiError;
use crate::auth::{AuthService, CurrentPrincipal, Pipeline, RefreshTokenStage, pipeline_middleware};
use crate::db::Database;
use crate::response::GenericResponse;

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub auth: Arc<AuthService>,
}

pub fn router(state: TokensState) -> Router {
    let refresh_guard = Pipeline::new(vec![Box::new(RefreshTokenStage::new(
        state.auth.clone(),
        state.db.clone(),
    ))]);

    Router::new()
        .route("/refresh-token", get(refresh_token))
        .layer(middleware::from_fn(pipeline_middleware(refresh_guard)))
        .with_state(state)
}

/// Mint a new access token for the principal the refresh stage resolved.
async fn refresh_token(
    State(state): State<TokensState>,
    CurrentPrincipal(user): CurrentPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let access = state
        .auth
        .codec()
        .generate_access_token(&user.uuid)
        .map_err(|e| {
            error!(error = %e, "failed to generate access token");
            ApiError::internal("Failed to generate token")
        })?;

    Ok(Json(GenericResponse::ok_with_data(
        "Access token refreshed",
        json!({
            "access_token": access.token,
            "expires_in": access.duration,
        }),
    )))
}
