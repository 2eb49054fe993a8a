//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `t=<unix>,v1=<hex>` in the signature header. Verification uses the hmac
//! crate's constant-time comparison, and payloads older than the freshness
//! window are rejected to mitigate replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed payload, in seconds
pub const FRESHNESS_WINDOW_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing or malformed")]
    Malformed,

    #[error("signature header is missing a timestamp")]
    MissingTimestamp,

    #[error("signature header is missing a v1 signature")]
    MissingSignature,

    #[error("payload timestamp is outside the freshness window")]
    Stale,

    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies a signed webhook payload against the shared secret
pub fn verify(payload: &[u8], signature_header: &str, secret: &str) -> Result<(), SignatureError> {
    verify_at(
        payload,
        signature_header,
        secret,
        chrono::Utc::now().timestamp(),
    )
}

/// Verification with an injectable clock; `now` is Unix seconds
pub fn verify_at(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() || signature_header.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                signature = hex::decode(value).ok();
            }
            _ => {}
        }
    }

    let has_t = signature_header
        .split(',')
        .any(|p| p.trim().starts_with("t="));
    let has_v1 = signature_header
        .split(',')
        .any(|p| p.trim().starts_with("v1="));
    if !has_t && !has_v1 {
        return Err(SignatureError::Malformed);
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    let signature = signature.ok_or(SignatureError::MissingSignature)?;

    if (now - timestamp).abs() > FRESHNESS_WINDOW_SECS {
        return Err(SignatureError::Stale);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)
}

/// Computes the signature header value for a payload; used by tests and
/// by outbound server-to-server calls.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
