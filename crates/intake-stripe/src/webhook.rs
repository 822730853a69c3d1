//! # Stripe Webhook Signatures
//!
//! Verification of the `Stripe-Signature` header:
//! `t=<unix seconds>,v1=<hex hmac>[,v1=...]`, where each `v1` is
//! HMAC-SHA256 of `"{t}.{raw body}"` keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use intake_core::{IntakeError, IntakeResult};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

/// Split `t=...,v1=...` into the timestamp and the decoded `v1` signatures.
///
/// `v1` values that are not hex are skipped, like unknown keys.
fn parse_signature_header(header: &str) -> IntakeResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(signature) = hex::decode(value) {
                    signatures.push(signature);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        IntakeError::InvalidSignature("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(IntakeError::InvalidSignature(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, timestamp: i64, payload: &[u8]) -> IntakeResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| IntakeError::Internal(format!("HMAC key rejected: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// True when `timestamp` lies within `tolerance_secs` of `now` in either direction
fn within_tolerance(timestamp: i64, now: i64, tolerance_secs: i64) -> bool {
    now.checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= tolerance_secs.unsigned_abs())
}

/// Check `header` against `payload` at time `now` (unix seconds).
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> IntakeResult<()> {
    let parts = parse_signature_header(header)?;

    if !within_tolerance(parts.timestamp, now, tolerance_secs) {
        return Err(IntakeError::InvalidSignature(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_hmac_sha256(secret, parts.timestamp, payload)?;
    if parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        Ok(())
    } else {
        Err(IntakeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ))
    }
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used to exercise the endpoint locally without the Stripe CLI.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> IntakeResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(compute_hmac_sha256(secret, timestamp, payload)?)
    ))
}
