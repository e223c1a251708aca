//! Core data model for tickergate
//!
//! Two persisted entities back the authorization server: the stable client
//! identity created at registration, and the short-lived authorization
//! attempt created by `/oauth/authorize` and consumed by `/oauth/token`.
//! Bearer tokens are never persisted; they are self-contained JWTs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder display name for clients that register without one
pub const DEFAULT_CLIENT_NAME: &str = "unnamed client";

/// Default scope granted when none is requested
pub const DEFAULT_SCOPE: &str = "all";

/// A registered client application
///
/// `client_secret` is issued exactly once at registration and plays no
/// further role in the protocol (public-client model - PKCE substitutes for
/// client authentication at the token endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: String,
    pub client_secret: String,
    pub client_name: String,
    /// Absolute URIs; `/oauth/authorize` requires an exact match against
    /// this set (no prefix or wildcard matching)
    pub redirect_uris: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pending authorization attempt
///
/// Created by `/oauth/authorize`, keyed by client id (one attempt per client,
/// last writer wins) and looked up by code at the token endpoint. Consumed
/// atomically on a successful authorization_code exchange so the code is
/// single-use. The record either exists in full or not at all; there is no
/// partially populated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub client_id: String,
    /// One-time opaque authorization code
    pub code: String,
    /// Stored PKCE challenge: base64url(SHA-256(code_verifier))
    pub code_challenge: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Age of this attempt in whole seconds, saturating at zero for clock skew
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds().max(0)
    }
}
