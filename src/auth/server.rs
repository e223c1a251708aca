//! OAuth2 authorization server
//!
//! Implements the authorization-code grant with PKCE (S256 only), dynamic
//! client registration behind the AK/SK signed-request scheme, and the
//! refresh-token grant over stateless bearer tokens. Every protocol failure
//! surfaces as `{error, error_description}` JSON; nothing crosses the module
//! boundary as an unhandled fault.

use crate::auth::signed_request::RegistrationAuthenticator;
use crate::auth::tokens::{TokenCodec, TokenError};
use crate::auth::validate;
use crate::config::OAuthConfig;
use crate::model::{ClientRecord, DEFAULT_CLIENT_NAME, DEFAULT_SCOPE, PendingAuthorization};
use crate::storage::Storage;
use crate::{Result, TickergateError};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// OAuth server state, injected into every handler
pub struct OAuthServerState {
    pub storage: Arc<dyn Storage>,
    pub config: OAuthConfig,
    pub codec: Arc<TokenCodec>,
    authenticator: Option<RegistrationAuthenticator>,
}

impl OAuthServerState {
    /// Build server state from validated configuration
    ///
    /// Fails when required secrets are absent - a configuration error at
    /// startup, never a per-request error.
    pub fn new(storage: Arc<dyn Storage>, config: OAuthConfig) -> Result<Self> {
        let secret = config
            .token_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TickergateError::config("Token signing secret is required"))?;
        let codec = Arc::new(TokenCodec::new(secret));

        let authenticator = if config.secured {
            match (
                config.registration_access_key.clone(),
                config.registration_secret_key.clone(),
            ) {
                (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => {
                    Some(RegistrationAuthenticator::new(ak, sk))
                }
                _ => {
                    return Err(TickergateError::config(
                        "Secured mode requires a registration access/secret key pair",
                    ));
                }
            }
        } else {
            None
        };

        Ok(Self {
            storage,
            config,
            codec,
            authenticator,
        })
    }
}

/// Protocol-level failure rendered as `{error, error_description}`
#[derive(Debug)]
pub enum OAuthError {
    InvalidRequest(String),
    InvalidClient(String),
    InvalidGrant(String),
    Unauthorized(String),
    Server(String),
}

impl OAuthError {
    fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidRequest(_)
            | OAuthError::InvalidClient(_)
            | OAuthError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            OAuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            OAuthError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::Unauthorized(_) => "unauthorized",
            OAuthError::Server(_) => "server_error",
        }
    }

    fn description(&self) -> &str {
        match self {
            OAuthError::InvalidRequest(d)
            | OAuthError::InvalidClient(d)
            | OAuthError::InvalidGrant(d)
            | OAuthError::Unauthorized(d)
            | OAuthError::Server(d) => d,
        }
    }

    fn storage(err: TickergateError) -> Self {
        tracing::error!("Storage failure in OAuth handler: {}", err);
        OAuthError::Server("An internal storage error occurred".to_string())
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({
                "error": self.error_code(),
                "error_description": self.description(),
            })),
        )
            .into_response()
    }
}

/// Dynamic client registration request
#[derive(Debug, Deserialize)]
struct ClientRegistrationRequest {
    #[serde(default)]
    client_name: Option<String>,
    redirect_uris: Vec<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Client registration response
#[derive(Debug, Serialize)]
struct ClientRegistrationResponse {
    client_id: String,
    client_secret: String,
    client_name: String,
    grant_types: Vec<String>,
    response_types: Vec<String>,
    token_endpoint_auth_method: String,
    scope: String,
    redirect_uris: Vec<String>,
}

/// Authorization request parameters
#[derive(Debug, Deserialize)]
struct AuthorizeRequest {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    code_challenge: Option<String>,
    #[serde(default)]
    code_challenge_method: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Token request parameters
#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    code_verifier: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Token response
#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: String,
    scope: String,
}

/// Create OAuth routes
pub fn create_oauth_routes(state: Arc<OAuthServerState>) -> Router {
    Router::new()
        .route(
            "/.well-known/oauth-authorization-server",
            get(handle_metadata_discovery),
        )
        .route("/oauth/register", post(handle_client_registration))
        .route("/oauth/authorize", get(handle_authorize))
        .route("/oauth/token", post(handle_token))
        .with_state(state)
}

/// Handle OAuth metadata discovery
///
/// client_credentials is advertised for downstream compatibility but the
/// token endpoint does not implement it.
async fn handle_metadata_discovery(
    State(state): State<Arc<OAuthServerState>>,
) -> impl IntoResponse {
    let issuer = &state.config.issuer;
    Json(json!({
        "issuer": issuer,
        "registration_endpoint": format!("{}/oauth/register", issuer),
        "authorization_endpoint": format!("{}/oauth/authorize", issuer),
        "token_endpoint": format!("{}/oauth/token", issuer),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token", "client_credentials"],
        "token_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": ["S256"],
    }))
}

/// Handle dynamic client registration
///
/// The signature covers the exact body bytes, so verification runs before
/// JSON parsing.
async fn handle_client_registration(
    State(state): State<Arc<OAuthServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(authenticator) = &state.authenticator
        && let Err(rejection) = authenticator.verify(&headers, &body)
    {
        tracing::warn!("Registration request rejected: {}", rejection);
        return OAuthError::Unauthorized(rejection.to_string()).into_response();
    }

    let req: ClientRegistrationRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return OAuthError::InvalidRequest(format!("Malformed registration body: {}", e))
                .into_response();
        }
    };

    if let Err(msg) = validate::validate_client_name(req.client_name.as_deref()) {
        return OAuthError::InvalidRequest(msg).into_response();
    }
    if let Err(msg) = validate::validate_redirect_uris(&req.redirect_uris) {
        return OAuthError::InvalidRequest(msg).into_response();
    }

    let now = Utc::now();
    let client = ClientRecord {
        client_id: Uuid::new_v4().to_string(),
        client_secret: generate_client_secret(),
        client_name: req
            .client_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
        redirect_uris: req.redirect_uris,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.storage.save_client(&client).await {
        return OAuthError::storage(e).into_response();
    }

    tracing::info!(client_id = %client.client_id, "Registered OAuth client");

    let response = ClientRegistrationResponse {
        client_id: client.client_id,
        client_secret: client.client_secret,
        client_name: client.client_name,
        grant_types: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        response_types: vec!["code".to_string()],
        token_endpoint_auth_method: "none".to_string(),
        scope: req.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        redirect_uris: client.redirect_uris,
    };

    (StatusCode::CREATED, Json(response)).into_response()
}

/// Handle authorization request
///
/// Mutates stored state and is not idempotent: a second call for the same
/// client replaces the pending attempt, invalidating the earlier code.
async fn handle_authorize(
    State(state): State<Arc<OAuthServerState>>,
    Query(req): Query<AuthorizeRequest>,
) -> Response {
    match authorize(&state, req).await {
        Ok(location) => Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, location)
            .body(axum::body::Body::empty())
            .unwrap_or_else(|_| {
                OAuthError::Server("Failed to build redirect".to_string()).into_response()
            }),
        Err(e) => e.into_response(),
    }
}

async fn authorize(
    state: &OAuthServerState,
    req: AuthorizeRequest,
) -> std::result::Result<String, OAuthError> {
    // Schema checks first, before touching the store
    let client_id = req
        .client_id
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))?;
    validate::validate_client_id(client_id).map_err(OAuthError::InvalidRequest)?;

    let redirect_uri = req
        .redirect_uri
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;
    validate::validate_redirect_uri(redirect_uri).map_err(OAuthError::InvalidRequest)?;

    let code_challenge = req
        .code_challenge
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest("code_challenge is required".to_string()))?;
    validate::validate_code_challenge(code_challenge).map_err(OAuthError::InvalidRequest)?;

    let challenge_method = req.code_challenge_method.as_deref().ok_or_else(|| {
        OAuthError::InvalidRequest("code_challenge_method is required".to_string())
    })?;

    let client = state
        .storage
        .get_client(client_id)
        .await
        .map_err(OAuthError::storage)?
        .ok_or_else(|| OAuthError::InvalidClient("unknown client".to_string()))?;

    if client.redirect_uris.is_empty() {
        return Err(OAuthError::InvalidRequest(
            "no redirect URIs registered".to_string(),
        ));
    }

    // Exact-match allow-list: the sole defense against authorization-code
    // interception via an attacker-controlled redirect target
    if !client.redirect_uris.iter().any(|u| u == redirect_uri) {
        tracing::warn!(client_id, "Authorize rejected: unregistered redirect_uri");
        return Err(OAuthError::InvalidRequest(
            "redirect_uri is not registered for this client".to_string(),
        ));
    }

    if challenge_method != "S256" {
        return Err(OAuthError::InvalidRequest(
            "unsupported code_challenge_method (only S256)".to_string(),
        ));
    }

    let pending = PendingAuthorization {
        client_id: client.client_id.clone(),
        code: Uuid::new_v4().to_string(),
        code_challenge: code_challenge.to_string(),
        scope: req.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        created_at: Utc::now(),
    };

    // Atomic replace: overwrites any prior pending attempt for this client
    state
        .storage
        .put_pending(&pending)
        .await
        .map_err(OAuthError::storage)?;

    tracing::debug!(client_id, "Issued authorization code");

    let mut location = url::Url::parse(redirect_uri)
        .map_err(|_| OAuthError::InvalidRequest("redirect_uri is not absolute".to_string()))?;
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &pending.code);
        if let Some(s) = &req.state {
            pairs.append_pair("state", s);
        }
    }
    Ok(location.into())
}

/// Handle token request
///
/// The form extractor is taken as a Result so a missing grant_type or an
/// undeserializable body still comes back in the protocol error envelope
/// rather than as the extractor's own rejection.
async fn handle_token(
    State(state): State<Arc<OAuthServerState>>,
    form: std::result::Result<axum::Form<TokenRequest>, FormRejection>,
) -> Response {
    let axum::Form(req) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return OAuthError::InvalidRequest(format!(
                "Malformed token request: {}",
                rejection.body_text()
            ))
            .into_response();
        }
    };

    let result = match req.grant_type.as_str() {
        "authorization_code" => handle_authorization_code_grant(&state, req).await,
        "refresh_token" => handle_refresh_token_grant(&state, req).await,
        other => Err(OAuthError::InvalidRequest(format!(
            "Unsupported grant_type: {}",
            other
        ))),
    };

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Handle authorization code grant
///
/// PKCE is the sole authentication of the request: anyone holding the
/// original code_verifier can redeem the code, which is why the code is
/// single-use and lifetime-bounded.
async fn handle_authorization_code_grant(
    state: &OAuthServerState,
    req: TokenRequest,
) -> std::result::Result<TokenResponse, OAuthError> {
    // Resolve the pending attempt by client_id if supplied, else by code
    let pending = match (&req.client_id, &req.code) {
        (Some(client_id), _) => state
            .storage
            .get_pending_by_client(client_id)
            .await
            .map_err(OAuthError::storage)?,
        (None, Some(code)) => state
            .storage
            .get_pending_by_code(code)
            .await
            .map_err(OAuthError::storage)?,
        (None, None) => None,
    };
    let pending = pending.ok_or_else(|| {
        OAuthError::InvalidClient("unknown client or authorization code".to_string())
    })?;

    let (Some(code), Some(code_verifier)) = (&req.code, &req.code_verifier) else {
        return Err(OAuthError::InvalidRequest(
            "code and code_verifier are required".to_string(),
        ));
    };

    if code.as_bytes().ct_eq(pending.code.as_bytes()).unwrap_u8() == 0 {
        return Err(OAuthError::InvalidGrant(
            "invalid authorization code".to_string(),
        ));
    }

    // code_challenge = BASE64URL-ENCODE(SHA256(ASCII(code_verifier)))
    let computed = compute_code_challenge(code_verifier);
    if computed
        .as_bytes()
        .ct_eq(pending.code_challenge.as_bytes())
        .unwrap_u8()
        == 0
    {
        tracing::warn!(client_id = %pending.client_id, "PKCE verification failed");
        return Err(OAuthError::InvalidGrant(
            "PKCE verification failed".to_string(),
        ));
    }

    if pending.age_seconds(Utc::now()) > state.config.auth_code_ttl_secs {
        // Expired attempts are dead either way; drop this one eagerly
        let _ = state.storage.take_pending_by_code(code).await;
        return Err(OAuthError::InvalidGrant(
            "authorization code expired".to_string(),
        ));
    }

    // Single-use enforcement: exactly one caller gets the attempt back
    let taken = state
        .storage
        .take_pending_by_code(code)
        .await
        .map_err(OAuthError::storage)?;
    let Some(taken) = taken else {
        return Err(OAuthError::InvalidGrant(
            "authorization code already redeemed".to_string(),
        ));
    };

    let scope = resolve_scope(Some(&taken.scope), req.scope.as_deref());
    mint_token_pair(state, &taken.client_id, &scope)
}

/// Handle refresh token grant
///
/// The refresh token's own validity is sufficient; no store lookup is made
/// and there is no denylist, so a leaked refresh token stays usable until
/// its expiry even after a legitimate refresh.
async fn handle_refresh_token_grant(
    state: &OAuthServerState,
    req: TokenRequest,
) -> std::result::Result<TokenResponse, OAuthError> {
    let Some(refresh_token) = &req.refresh_token else {
        return Err(OAuthError::InvalidRequest(
            "refresh_token is required".to_string(),
        ));
    };

    let claims = state.codec.verify(refresh_token).map_err(|e| match e {
        TokenError::Expired => OAuthError::InvalidGrant("refresh token expired".to_string()),
        _ => OAuthError::InvalidGrant("invalid refresh token".to_string()),
    })?;

    let scope = resolve_scope(Some(&claims.scope), req.scope.as_deref());
    mint_token_pair(state, &claims.sub, &scope)
}

/// scope = stored ?? requested ?? "all"
fn resolve_scope(stored: Option<&str>, requested: Option<&str>) -> String {
    stored
        .filter(|s| !s.is_empty())
        .or(requested.filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_SCOPE)
        .to_string()
}

fn mint_token_pair(
    state: &OAuthServerState,
    client_id: &str,
    scope: &str,
) -> std::result::Result<TokenResponse, OAuthError> {
    let access_ttl = state.config.access_token_ttl_secs;
    let refresh_ttl = state.config.refresh_token_ttl_secs;

    let access_token = state
        .codec
        .mint(client_id, access_ttl, scope)
        .map_err(|e| OAuthError::Server(e.to_string()))?;
    let refresh_token = state
        .codec
        .mint(client_id, refresh_ttl, scope)
        .map_err(|e| OAuthError::Server(e.to_string()))?;

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: access_ttl,
        refresh_token,
        scope: scope.to_string(),
    })
}

/// Compute the S256 PKCE challenge for a verifier
pub fn compute_code_challenge(code_verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        hasher.finalize(),
    )
}

/// Generate secure client secret (using cryptographically secure RNG)
pub fn generate_client_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
