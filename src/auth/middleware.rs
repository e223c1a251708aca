//! Bearer-token authentication for resource handlers
//!
//! Downstream routes trust the self-contained tokens minted by the server:
//! validation is pure signature + expiry checking against the shared secret,
//! with no storage lookup, so it is safe under unlimited concurrency.

use crate::auth::tokens::{BearerClaims, TokenCodec, TokenError};
use crate::{Result, TickergateError};
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};
use std::sync::Arc;

/// State injected as an axum Extension for bearer validation
#[derive(Clone)]
pub struct BearerAuthState {
    pub codec: Arc<TokenCodec>,
}

/// Authenticated client extracted from a valid Bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub client_id: String,
    pub scope: String,
    pub claims: BearerClaims,
}

impl<S> FromRequestParts<S> for AuthenticatedClient
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>> + Send {
        let auth_state = parts.extensions.get::<BearerAuthState>().cloned();
        let token = extract_bearer_token(parts);

        async move {
            let auth_state = auth_state.ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Bearer auth not configured".to_string(),
            ))?;
            let token = token.ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing or malformed Authorization header".to_string(),
            ))?;

            let claims = auth_state.codec.verify(&token).map_err(|e| {
                let message = match e {
                    TokenError::Expired => "Token expired",
                    TokenError::NotActive => "Token not yet active",
                    _ => "Invalid token",
                };
                (StatusCode::UNAUTHORIZED, message.to_string())
            })?;

            Ok(AuthenticatedClient {
                client_id: claims.sub.clone(),
                scope: claims.scope.clone(),
                claims,
            })
        }
    }
}

/// Helper to extract Bearer token from request parts
pub fn extract_bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
}

/// Validate a raw token string and return the authenticated client
pub fn validate_token(codec: &TokenCodec, token: &str) -> Result<AuthenticatedClient> {
    let claims = codec
        .verify(token)
        .map_err(|e| TickergateError::auth(e.to_string()))?;
    Ok(AuthenticatedClient {
        client_id: claims.sub.clone(),
        scope: claims.scope.clone(),
        claims,
    })
}
