//! Stripe webhook signature verification.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret. The `Stripe-Signature` header has the form
//! `t=1492774577,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd`, possibly with several `v1`
//! entries while a secret is being rolled. The signature is `HMAC-SHA256(secret, "{t}.{payload}")`, hex encoded.
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use thiserror::Error;

use crate::StripeEvent;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookSignatureError {
    #[error("No signature header was provided")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The webhook timestamp is outside the tolerance window")]
    TimestampOutsideTolerance,
    #[error("No signature matched the payload")]
    SignatureMismatch,
    #[error("The webhook signing secret cannot be used. {0}")]
    InvalidSecret(String),
    #[error("The webhook payload is not a valid event. {0}")]
    InvalidPayload(String),
}

/// Computes the hex-encoded `v1` signature for `payload` sent at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookSignatureError> {
    let mac = new_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookSignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| WebhookSignatureError::InvalidSecret(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks the `Stripe-Signature` header against the raw request body.
///
/// `now` is the current unix time in seconds. Deliveries older (or further in the future) than `tolerance_secs` are
/// rejected to limit replay attacks. Any one matching `v1` entry is sufficient.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookSignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|e| WebhookSignatureError::MalformedHeader(format!("Invalid timestamp. {e}")))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| WebhookSignatureError::MalformedHeader("No timestamp".into()))?;
    if signatures.is_empty() {
        return Err(WebhookSignatureError::MalformedHeader("No v1 signature".into()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        debug!("🔐️ Webhook timestamp {timestamp} is outside the tolerance window (now: {now})");
        return Err(WebhookSignatureError::TimestampOutsideTolerance);
    }
    let mut matched = false;
    for sig in signatures.iter().filter_map(|s| hex::decode(s).ok()) {
        if new_mac(secret, timestamp, payload)?.verify_slice(&sig).is_ok() {
            matched = true;
            break;
        }
    }
    if matched {
        Ok(())
    } else {
        Err(WebhookSignatureError::SignatureMismatch)
    }
}

/// Verifies the signature against the current time and parses the payload into a [`StripeEvent`].
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<StripeEvent, WebhookSignatureError> {
    verify_signature(payload, header, secret, tolerance_secs, Utc::now().timestamp())?;
    serde_json::from_slice::<StripeEvent>(payload).map_err(|e| WebhookSignatureError::InvalidPayload(e.to_string()))
}
