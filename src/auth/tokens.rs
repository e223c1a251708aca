//! Stateless bearer-token codec
//!
//! Access and refresh tokens share one shape: an HS256 JWT carrying the
//! client id as subject, issuance time, expiry, and the granted scope,
//! signed with the server-held secret. Nothing is persisted, so validity is
//! exactly signature + expiry - tokens cannot be revoked before they expire.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims embedded in every bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Client id the token was minted for
    pub sub: String,
    /// Issued-at, epoch seconds
    pub iat: i64,
    /// Expiry, epoch seconds
    pub exp: i64,
    /// Granted scope (single opaque string)
    pub scope: String,
}

/// Why verification failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token not yet active")]
    NotActive,

    #[error("invalid token")]
    Invalid,

    #[error("token verification failed")]
    Unknown,
}

/// Mints and verifies bearer tokens against a shared secret
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is invalid at t >= exp, no leeway
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mint a token for `subject` valid for `duration_secs` from now
    pub fn mint(&self, subject: &str, duration_secs: i64, scope: &str) -> crate::Result<String> {
        let iat = Utc::now().timestamp();
        let claims = BearerClaims {
            sub: subject.to_string(),
            iat,
            exp: iat + duration_secs,
            scope: scope.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| crate::TickergateError::auth(format!("Failed to mint token: {}", e)))
    }

    /// Verify a token: signature integrity first, then expiry
    pub fn verify(&self, token: &str) -> Result<BearerClaims, TokenError> {
        let claims = decode::<BearerClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotActive,
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Invalid,
                _ => TokenError::Unknown,
            })?;

        // The library's exp check is exclusive (a token is live at t == exp);
        // expiry here means invalid from t >= exp
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
