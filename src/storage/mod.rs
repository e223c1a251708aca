//! Storage backends for tickergate
//!
//! Provides multiple storage backends with a unified trait interface. The
//! authorization server depends only on this trait - an explicit store
//! handle injected at construction, never a process-wide singleton.

pub mod memory;
pub mod sqlite;

use crate::model::{ClientRecord, PendingAuthorization};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage trait for client records and pending authorization attempts
///
/// Pending-attempt operations carry the concurrency contract of the
/// authorization flow: `put_pending` replaces a client's attempt atomically
/// (deterministic last-writer-wins, never a torn record), and
/// `take_pending_by_code` removes and returns atomically so an authorization
/// code can be redeemed at most once.
#[async_trait]
pub trait Storage: Send + Sync {
    // Client methods
    /// Save a client record (insert or update by client id)
    async fn save_client(&self, client: &ClientRecord) -> Result<()>;

    /// Get a client record by id
    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRecord>>;

    // Pending authorization methods
    /// Replace the pending authorization attempt for a client atomically
    async fn put_pending(&self, pending: &PendingAuthorization) -> Result<()>;

    /// Get a pending attempt by client id
    async fn get_pending_by_client(
        &self,
        client_id: &str,
    ) -> Result<Option<PendingAuthorization>>;

    /// Get a pending attempt by authorization code
    async fn get_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>>;

    /// Atomically fetch and delete a pending attempt by code
    /// Returns None if not found, preventing double redemption
    async fn take_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>>;
}

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Create a storage backend from configuration
pub async fn create_storage_from_config(
    config: &crate::config::StorageConfig,
) -> Result<Arc<dyn Storage>> {
    match config.driver.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        "sqlite" => Ok(Arc::new(SqliteStorage::new(&config.dsn).await?)),
        _ => Err(crate::TickergateError::config(format!(
            "Unknown storage driver: {}. Supported: memory, sqlite",
            config.driver
        ))),
    }
}
