//! Signed-request verification for the registration endpoint
//!
//! In secured deployments, /oauth/register is gated by a pre-shared
//! access-key/secret-key pair. Callers send three headers:
//!
//! - `access-key`: the pre-shared access key
//! - `timestamp`: epoch milliseconds as a string
//! - `signature`: hex-encoded HMAC-SHA256 over `access_key || timestamp || body`
//!
//! Verification is pure: no state is read or written. Timestamps more than
//! five minutes away from server time in either direction are rejected, which
//! bounds the replay window and guards against clock-skew abuse. All secret
//! comparisons are constant-time.

use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_KEY_HEADER: &str = "access-key";
pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const SIGNATURE_HEADER: &str = "signature";

/// Accepted distance between the signed timestamp and server time
pub const MAX_TIMESTAMP_SKEW_MS: i64 = 5 * 60 * 1000;

/// Rejection reasons, surfaced verbatim in the 401 body
///
/// The messages deliberately reveal nothing beyond which stage failed; in
/// particular a signature length mismatch reports the same "invalid
/// signature" as a value mismatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignedRequestRejection {
    #[error("missing headers")]
    MissingHeaders,

    #[error("invalid access key")]
    InvalidAccessKey,

    #[error("timestamp expired")]
    TimestampExpired,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Verifies the AK/SK envelope protecting client registration
#[derive(Clone)]
pub struct RegistrationAuthenticator {
    access_key: String,
    secret_key: String,
}

impl RegistrationAuthenticator {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }

    /// Verify the signed-request headers against the raw request body
    ///
    /// The body must be the exact bytes received; registration parses JSON
    /// only after this check passes.
    pub fn verify(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<(), SignedRequestRejection> {
        let (access_key, timestamp, signature) = match (
            header_str(headers, ACCESS_KEY_HEADER),
            header_str(headers, TIMESTAMP_HEADER),
            header_str(headers, SIGNATURE_HEADER),
        ) {
            (Some(a), Some(t), Some(s)) => (a, t, s),
            _ => return Err(SignedRequestRejection::MissingHeaders),
        };

        if access_key
            .as_bytes()
            .ct_eq(self.access_key.as_bytes())
            .unwrap_u8()
            == 0
        {
            return Err(SignedRequestRejection::InvalidAccessKey);
        }

        let ts_millis: i64 = timestamp
            .parse()
            .map_err(|_| SignedRequestRejection::TimestampExpired)?;
        let now_millis = Utc::now().timestamp_millis();
        if (now_millis - ts_millis).abs() > MAX_TIMESTAMP_SKEW_MS {
            return Err(SignedRequestRejection::TimestampExpired);
        }

        // Field concatenation with no separator; the timestamp header makes
        // each signature unique within the replay window
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|_| SignedRequestRejection::InvalidSignature)?;
        mac.update(access_key.as_bytes());
        mac.update(timestamp.as_bytes());
        mac.update(raw_body);
        let expected = mac.finalize().into_bytes();

        let supplied =
            hex::decode(signature).map_err(|_| SignedRequestRejection::InvalidSignature)?;

        // Fail closed on length mismatch without attempting the compare
        if supplied.len() != expected.len() {
            return Err(SignedRequestRejection::InvalidSignature);
        }
        if supplied.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 0 {
            return Err(SignedRequestRejection::InvalidSignature);
        }

        Ok(())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Compute the signature a caller would send, exposed for tests and tooling
pub fn sign_request(secret_key: &str, access_key: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(access_key.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
