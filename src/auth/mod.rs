//! Bearer-token authentication.
//!
//! Dual-token system: short-lived access tokens (5 min, stateless) and
//! long-lived refresh tokens (2 weeks) bound to a per-user rotatable secret
//! via an HMAC custom key. Requests pass through an explicit stage pipeline
//! that validates payloads and tokens before handlers run.

mod context;
mod error;
mod extract;
mod key;
mod service;
mod stage;

pub use context::{AuthContext, Credentials};
pub use error::AuthFailure;
pub use extract::{CurrentPrincipal, CurrentPrincipalId, ValidCredentials};
pub use key::generate_custom_key;
pub use service::AuthService;
pub use stage::{
    AccessTokenStage, PayloadValidationStage, Pipeline, RefreshTokenStage, Stage, StageOutcome,
    extract_bearer_token, pipeline_middleware,
};
