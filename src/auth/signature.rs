//! HMAC-SHA256 webhook signature verification.
//!
//! # Security
//! - The tag is computed over the raw request bytes, never a re-serialized payload
//! - Comparison is constant-time via `subtle::ConstantTimeEq`
//! - Verification happens before the body is parsed

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookSecret;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value (`sha256=<hex>`) for a body.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.key_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a delivered signature against the raw body.
///
/// The header value is accepted with or without the `sha256=` prefix.
pub fn verify_signature(
    secret: Option<&WebhookSecret>,
    provided: Option<&str>,
    body: &[u8],
) -> AppResult<()> {
    let provided = provided
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Authentication("Missing signature".to_string()))?;

    let secret = secret.ok_or_else(|| {
        tracing::error!(target: "webhook", "Webhook secret not configured, rejecting delivery");
        AppError::Authentication("Webhook not configured".to_string())
    })?;

    let normalized = if provided.starts_with(SIGNATURE_PREFIX) {
        provided.to_string()
    } else {
        format!("{}{}", SIGNATURE_PREFIX, provided)
    };

    let expected = sign(secret, body);

    // Unequal lengths compare as false without an early exit.
    if expected.as_bytes().ct_eq(normalized.as_bytes()).into() {
        Ok(())
    } else {
        Err(AppError::Authentication("Invalid signature".to_string()))
    }
}
