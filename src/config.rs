//! Configuration management for tickergate
//!
//! Loads configuration from tickergate.config.json with environment-variable
//! overrides for secrets. Configuration is read once at process start;
//! missing required secrets are a fatal startup error, never a per-request
//! error.

use crate::{Result, TickergateError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "tickergate.config.json";

/// Complete tickergate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Storage configuration (required)
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Authorization server configuration
    #[serde(default)]
    pub oauth: OAuthConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Driver name (memory, sqlite)
    pub driver: String,

    /// Data source name / database path
    pub dsn: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Authorization server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    /// Issuer URL advertised in discovery metadata and used to build
    /// endpoint URLs
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Shared secret signing bearer tokens. Overridable via
    /// TICKERGATE_TOKEN_SECRET; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// Maximum age of an authorization code at redemption, in seconds
    #[serde(default = "default_code_ttl")]
    pub auth_code_ttl_secs: i64,

    /// When true, /oauth/register requires the AK/SK signed-request headers
    #[serde(default)]
    pub secured: bool,

    /// Registration access key (required in secured mode). Overridable via
    /// TICKERGATE_REGISTRATION_ACCESS_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_access_key: Option<String>,

    /// Registration secret key (required in secured mode). Overridable via
    /// TICKERGATE_REGISTRATION_SECRET_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_secret_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_issuer() -> String {
    "http://localhost:3000".to_string()
}

fn default_access_ttl() -> i64 {
    3600
}

fn default_refresh_ttl() -> i64 {
    30 * 24 * 3600
}

fn default_code_ttl() -> i64 {
    300
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            token_secret: None,
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            auth_code_ttl_secs: default_code_ttl(),
            secured: false,
            registration_access_key: None,
            registration_secret_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                driver: "memory".to_string(),
                dsn: String::new(),
            },
            http: HttpConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults when the
    /// default path does not exist. Environment overrides are applied after
    /// the file is parsed, and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            TickergateError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            TickergateError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var("TICKERGATE_TOKEN_SECRET") {
            self.oauth.token_secret = Some(secret);
        }
        if let Ok(key) = env::var("TICKERGATE_REGISTRATION_ACCESS_KEY") {
            self.oauth.registration_access_key = Some(key);
        }
        if let Ok(key) = env::var("TICKERGATE_REGISTRATION_SECRET_KEY") {
            self.oauth.registration_secret_key = Some(key);
        }
        if let Ok(dsn) = env::var("TICKERGATE_STORAGE_DSN") {
            self.storage.dsn = dsn;
        }
    }

    /// Validate the configuration, treating missing secrets as fatal
    pub fn validate(&self) -> Result<()> {
        match &self.oauth.token_secret {
            Some(secret) if !secret.is_empty() => {}
            _ => {
                return Err(TickergateError::config(
                    "Token signing secret is required (set oauth.tokenSecret or TICKERGATE_TOKEN_SECRET)",
                ));
            }
        }

        if self.oauth.secured {
            let has_ak = self
                .oauth
                .registration_access_key
                .as_deref()
                .is_some_and(|k| !k.is_empty());
            let has_sk = self
                .oauth
                .registration_secret_key
                .as_deref()
                .is_some_and(|k| !k.is_empty());
            if !has_ak || !has_sk {
                return Err(TickergateError::config(
                    "Secured mode requires a registration access/secret key pair",
                ));
            }
        }

        if self.oauth.access_token_ttl_secs <= 0
            || self.oauth.refresh_token_ttl_secs <= 0
            || self.oauth.auth_code_ttl_secs <= 0
        {
            return Err(TickergateError::config(
                "Token and authorization-code lifetimes must be positive",
            ));
        }

        Ok(())
    }
}
