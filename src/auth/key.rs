//! Custom-key derivation for refresh tokens.
//!
//! The custom key binds a refresh token to the user's server-side token
//! secret. Validation recomputes the key from the currently stored secret, so
//! rotating the secret invalidates every previously issued refresh token
//! without any blocklist.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the custom key for a user: HMAC-SHA256 keyed by the user's token
/// secret over the user's UUID, hex-encoded.
///
/// Deterministic: the same (uuid, secret) pair always yields the same key.
pub fn generate_custom_key(user_uuid: &str, token_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(token_secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(user_uuid.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
