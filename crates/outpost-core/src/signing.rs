//! Webhook Signer (spec.md §4.5): dual-secret signature emission with a
//! time-bounded grace window after rotation.

use crate::entities::WebhookCredentials;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const MIN_SECRET_LEN: usize = 32;
const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("secret must be at least {min} characters")]
    SecretTooShort { min: usize },
}

/// Signatures for a single payload. `previous` is populated only while the
/// rotation grace window is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    pub current: String,
    pub previous: Option<String>,
}

/// Generate a fresh secret of at least [`MIN_SECRET_LEN`] alphanumeric
/// characters, used when a destination is created without one.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    (0..MIN_SECRET_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SECRET_ALPHABET.len());
            SECRET_ALPHABET[idx] as char
        })
        .collect()
}

/// Atomically rotate `credentials`: current secret becomes
/// `previous_secret`, `previous_secret_invalid_at` is set to `now + grace`,
/// and a new current secret is generated.
pub fn rotate_secret(credentials: &mut WebhookCredentials, grace: Duration, now: DateTime<Utc>) {
    credentials.previous_secret = Some(credentials.secret.clone());
    credentials.previous_secret_invalid_at = Some(now + grace);
    credentials.secret = generate_secret();
}

fn hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Compute the signature set for `payload` under `credentials` as of `now`.
pub fn sign(credentials: &WebhookCredentials, payload: &[u8], now: DateTime<Utc>) -> SignatureSet {
    let current = hmac_hex(&credentials.secret, payload);

    let previous = match (&credentials.previous_secret, credentials.previous_secret_invalid_at) {
        (Some(secret), Some(invalid_at)) if now < invalid_at => Some(hmac_hex(secret, payload)),
        _ => None,
    };

    SignatureSet { current, previous }
}

/// Verify `signature` (hex-encoded HMAC-SHA256, with or without a
/// `sha256=` prefix) against `credentials`, accepting the previous secret
/// during the grace window.
pub fn verify(
    credentials: &WebhookCredentials,
    payload: &[u8],
    signature: &str,
    now: DateTime<Utc>,
) -> bool {
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };

    if verify_one(&credentials.secret, payload, &provided) {
        return true;
    }

    if let (Some(secret), Some(invalid_at)) =
        (&credentials.previous_secret, credentials.previous_secret_invalid_at)
    {
        if now < invalid_at && verify_one(secret, payload, &provided) {
            return true;
        }
    }

    false
}

fn verify_one(secret: &str, payload: &[u8], provided: &[u8]) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();
    expected.ct_eq(provided).into()
}

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;
