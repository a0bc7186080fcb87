use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic keyed digest (hex HMAC-SHA256) used for stored passwords.
pub fn hash_password(secret: &str, plain: &str) -> anyhow::Result<String> {
    anyhow::ensure!(!plain.is_empty(), "cannot hash an empty password");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
        error!(error = %e, "hmac key error");
        anyhow::anyhow!(e.to_string())
    })?;
    mac.update(plain.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of `plain` against a stored digest.
pub fn verify_password(secret: &str, plain: &str, digest: &str) -> bool {
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(plain.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
