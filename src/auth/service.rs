//! Token validation service.

use std::sync::Arc;

use tracing::debug;

use super::error::AuthFailure;
use super::key;
use crate::jwt::TokenCodec;

/// Validates bearer tokens and derives custom keys.
///
/// Failures collapse to [`AuthFailure::InvalidToken`] for callers; the codec's
/// specific reason is logged here and goes no further.
#[derive(Clone)]
pub struct AuthService {
    codec: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// The underlying codec, for minting tokens at login/refresh.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Validate an access token and return the subject user UUID.
    pub fn validate_access_token(&self, raw: &str) -> Result<String, AuthFailure> {
        match self.codec.validate_access_token(raw) {
            Ok(claims) => Ok(claims.sub),
            Err(e) => {
                debug!(error = %e, "access token rejected");
                Err(AuthFailure::InvalidToken)
            }
        }
    }

    /// Validate a refresh token and return the subject user UUID together
    /// with the embedded custom-key fingerprint. Does not touch storage; the
    /// refresh stage compares the fingerprint against the stored secret.
    pub fn validate_refresh_token(&self, raw: &str) -> Result<(String, String), AuthFailure> {
        match self.codec.validate_refresh_token(raw) {
            Ok(claims) => Ok((claims.sub, claims.cks)),
            Err(e) => {
                debug!(error = %e, "refresh token rejected");
                Err(AuthFailure::InvalidToken)
            }
        }
    }

    /// Derive the custom key for a user from the given token secret.
    pub fn generate_custom_key(&self, user_uuid: &str, token_secret: &str) -> String {
        key::generate_custom_key(user_uuid, token_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Arc::new(TokenCodec::new(b"test-secret-key-for-testing")))
    }

    #[test]
    fn test_access_token_round_trip() {
        let auth = service();
        let result = auth.codec().generate_access_token("uuid-123").unwrap();

        let sub = auth.validate_access_token(&result.token).unwrap();
        assert_eq!(sub, "uuid-123");
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let auth = service();
        let custom_key = auth.generate_custom_key("uuid-123", "stored-secret");
        let result = auth
            .codec()
            .generate_refresh_token("uuid-123", &custom_key)
            .unwrap();

        let (sub, cks) = auth.validate_refresh_token(&result.token).unwrap();
        assert_eq!(sub, "uuid-123");
        assert_eq!(cks, custom_key);
    }

    #[test]
    fn test_garbage_tokens_fail_uniformly() {
        let auth = service();

        let access = auth.validate_access_token("not.a.jwt");
        assert!(matches!(access, Err(AuthFailure::InvalidToken)));

        let refresh = auth.validate_refresh_token("not.a.jwt");
        assert!(matches!(refresh, Err(AuthFailure::InvalidToken)));
    }

    #[test]
    fn test_class_confusion_fails() {
        let auth = service();
        let access = auth.codec().generate_access_token("uuid-123").unwrap();

        let result = auth.validate_refresh_token(&access.token);
        assert!(matches!(result, Err(AuthFailure::InvalidToken)));
    }
}
