//! Webhook signature verification.
//!
//! The provider signs each delivery with a `Stripe-Signature` style header:
//! `t=<unix timestamp>,v1=<hex hmac-sha256 of "<t>.<payload>">`. Verification
//! checks both the signature and the timestamp (replay window).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (or clock skew) of a signed delivery.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("missing or malformed signature header")]
    MalformedHeader,
    #[error("signature timestamp outside the {TIMESTAMP_TOLERANCE_SECS}s tolerance")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    SignatureMismatch,
}

/// Verify a signed webhook delivery against the endpoint secret.
///
/// `now` is the current unix timestamp, passed in so the replay window is
/// testable without a clock.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now: i64,
) -> Result<(), VerifyError> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<&str> = None;

    // Header shape: t=timestamp,v1=signature[,v0=signature...]
    for part in header.split(',') {
        match part.splitn(2, '=').collect::<Vec<_>>()[..] {
            ["t", value] => timestamp = value.parse().ok(),
            ["v1", value] => v1_signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(VerifyError::MalformedHeader)?;
    let v1_signature = v1_signature.ok_or(VerifyError::MalformedHeader)?;

    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(VerifyError::TimestampOutOfTolerance);
    }

    let expected = compute_signature(secret, timestamp, payload)?;
    if !constant_time_eq(expected.as_bytes(), v1_signature.as_bytes()) {
        return Err(VerifyError::SignatureMismatch);
    }

    Ok(())
}

/// Hex HMAC-SHA256 over `"<timestamp>.<payload>"`, keyed by the secret with
/// its `whsec_` prefix stripped.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &str,
) -> Result<String, VerifyError> {
    let key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| VerifyError::MalformedHeader)?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"charge.succeeded"}"#;

    fn signed_header(timestamp: i64) -> String {
        let sig = compute_signature(SECRET, timestamp, PAYLOAD).unwrap();
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn accepts_valid_signature() {
        let now = 1_700_000_000;
        let header = signed_header(now);
        assert_eq!(verify_signature(SECRET, &header, PAYLOAD, now), Ok(()));
    }

    #[test]
    fn accepts_signature_within_tolerance() {
        let now = 1_700_000_000;
        let header = signed_header(now - TIMESTAMP_TOLERANCE_SECS);
        assert_eq!(verify_signature(SECRET, &header, PAYLOAD, now), Ok(()));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let now = 1_700_000_000;
        let header = signed_header(now - TIMESTAMP_TOLERANCE_SECS - 1);
        assert_eq!(
            verify_signature(SECRET, &header, PAYLOAD, now),
            Err(VerifyError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = 1_700_000_000;
        let sig = compute_signature("whsec_other", now, PAYLOAD).unwrap();
        let header = format!("t={now},v1={sig}");
        assert_eq!(
            verify_signature(SECRET, &header, PAYLOAD, now),
            Err(VerifyError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let now = 1_700_000_000;
        let header = signed_header(now);
        assert_eq!(
            verify_signature(SECRET, &header, r#"{"id":"evt_2"}"#, now),
            Err(VerifyError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        let now = 1_700_000_000;
        for header in ["", "v1=abc", "t=123", "t=notanumber,v1=abc", "garbage"] {
            assert_eq!(
                verify_signature(SECRET, header, PAYLOAD, now),
                Err(VerifyError::MalformedHeader),
                "header: {header:?}"
            );
        }
    }
}
