//! Error types for tickergate
//!
//! This module provides the crate-wide error hierarchy using thiserror.
//! All errors can be converted to TickergateError for unified error handling.

use thiserror::Error;

/// Main error type for tickergate operations
#[derive(Error, Debug)]
pub enum TickergateError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// Implement From for sqlx::Error
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for TickergateError {
    fn from(err: sqlx::Error) -> Self {
        TickergateError::Storage(StorageError::from(err))
    }
}

/// Convenient result type for tickergate operations
pub type Result<T> = std::result::Result<T, TickergateError>;

impl TickergateError {
    /// Create a config error
    #[inline]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TickergateError::Config(msg.into())
    }

    /// Create a storage error
    #[inline]
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TickergateError::Storage(StorageError::Database(msg.into()))
    }

    /// Create an auth error
    #[inline]
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        TickergateError::OAuth(msg.into())
    }
}
