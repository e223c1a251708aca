//! HTTP server for tickergate
//!
//! Assembles the OAuth routes plus a health probe and a sample
//! bearer-protected resource route, and binds the listener.

use crate::auth::{AuthenticatedClient, BearerAuthState, OAuthServerState, create_oauth_routes};
use crate::config::Config;
use crate::{Result, TickergateError};
use axum::{Extension, Json, Router, routing::get};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Build the full application router
pub fn create_app(oauth_state: Arc<OAuthServerState>) -> Router {
    // Resource routes verify against the same codec that mints tokens
    let bearer_state = BearerAuthState {
        codec: oauth_state.codec.clone(),
    };

    Router::new()
        .route("/healthz", get(handle_health))
        .route("/api/whoami", get(handle_whoami))
        .merge(create_oauth_routes(oauth_state))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(false))
                        .on_response(DefaultOnResponse::new()),
                )
                .layer(Extension(bearer_state)),
        )
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Sample resource route: reports the client behind a valid bearer token
async fn handle_whoami(client: AuthenticatedClient) -> Json<serde_json::Value> {
    Json(json!({
        "client_id": client.client_id,
        "scope": client.scope,
        "expires_at": client.claims.exp,
    }))
}

/// Start the HTTP server and serve until shutdown
pub async fn serve(config: &Config, oauth_state: Arc<OAuthServerState>) -> Result<()> {
    let app = create_app(oauth_state);

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|e| TickergateError::config(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("tickergate listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| TickergateError::config(format!("Server error: {}", e)))?;
    Ok(())
}
