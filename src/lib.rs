//! tickergate - credential-issuance backend for the market-data platform
//!
//! This library implements the authorization side of the platform:
//! - OAuth2 authorization-code grant with PKCE (S256 only)
//! - Dynamic client registration, gated by an AK/SK signed-request scheme
//!   in secured deployments
//! - Stateless signed bearer tokens consumed by downstream resource servers
//!
//! # Example
//!
//! ```rust,no_run
//! use tickergate::auth::{OAuthServerState, create_oauth_routes};
//! use tickergate::config::Config;
//! use tickergate::storage::create_storage_from_config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let storage = create_storage_from_config(&config.storage).await?;
//!     let state = Arc::new(OAuthServerState::new(storage, config.oauth.clone())?);
//!     let router = create_oauth_routes(state);
//!     // mount `router` into your application
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod model;

// Infrastructure
pub mod config;
pub mod storage;

// Authorization engine and interface layers
pub mod auth;
pub mod cli;
pub mod http;

// Re-exports for convenience
pub use error::{Result, StorageError, TickergateError};

/// Initialize logging for the application
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tickergate=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
