//! OAuth2 authorization engine
//!
//! The credential-issuance core of tickergate:
//! - **Server**: authorization-code grant with PKCE, dynamic client
//!   registration, refresh-token grant
//! - **Signed requests**: AK/SK HMAC envelope gating registration in
//!   secured deployments
//! - **Tokens**: stateless signed bearer tokens shared with downstream
//!   resource servers
//! - **Middleware**: bearer-token extractor for resource handlers

pub mod middleware;
pub mod server;
pub mod signed_request;
pub mod tokens;
pub mod validate;

pub use middleware::{AuthenticatedClient, BearerAuthState, validate_token};
pub use server::{OAuthServerState, compute_code_challenge, create_oauth_routes};
pub use signed_request::{RegistrationAuthenticator, SignedRequestRejection, sign_request};
pub use tokens::{BearerClaims, TokenCodec, TokenError};

#[cfg(test)]
mod middleware_test;
