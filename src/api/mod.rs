mod error;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::jwt::TokenCodec;

pub use error::{ApiError, ResultExt};
pub use tokens::TokensState;
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(db: Database, codec: Arc<TokenCodec>) -> Router {
    let auth = Arc::new(AuthService::new(codec));

    let users_state = users::UsersState {
        db: db.clone(),
        auth: auth.clone(),
    };

    let tokens_state = tokens::TokensState { db, auth };

    Router::new()
        .merge(users::router(users_state))
        .merge(tokens::router(tokens_state))
}
