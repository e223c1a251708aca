//! In-memory storage implementation
//!
//! Fast, non-persistent storage for development and testing.
//! Uses DashMap for lock-free concurrent access.
//!
//! **WARNING:** MemoryStorage is NOT recommended for production use:
//! - Data is lost on process restart
//! - Does not coordinate state across multiple process instances
//!
//! For production deployments, use SqliteStorage.

use super::*;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory storage implementation - uses DashMap for lock-free concurrent access
#[derive(Clone, Default)]
pub struct MemoryStorage {
    clients: Arc<DashMap<String, ClientRecord>>,
    // Keyed by client id: one pending attempt per client, last writer wins
    pending: Arc<DashMap<String, PendingAuthorization>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    fn find_client_id_by_code(&self, code: &str) -> Option<String> {
        self.pending
            .iter()
            .find(|entry| entry.value().code == code)
            .map(|entry| entry.key().clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    // Client methods
    async fn save_client(&self, client: &ClientRecord) -> Result<()> {
        self.clients
            .insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRecord>> {
        Ok(self.clients.get(client_id).map(|r| r.clone()))
    }

    // Pending authorization methods
    async fn put_pending(&self, pending: &PendingAuthorization) -> Result<()> {
        // DashMap::insert replaces the whole value under the per-key lock,
        // so concurrent writers cannot tear an attempt
        self.pending
            .insert(pending.client_id.clone(), pending.clone());
        Ok(())
    }

    async fn get_pending_by_client(
        &self,
        client_id: &str,
    ) -> Result<Option<PendingAuthorization>> {
        Ok(self.pending.get(client_id).map(|r| r.clone()))
    }

    async fn get_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>> {
        Ok(self
            .pending
            .iter()
            .find(|entry| entry.value().code == code)
            .map(|entry| entry.value().clone()))
    }

    async fn take_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>> {
        // Resolve the owning client, then remove under the per-key lock with
        // the code re-checked, so two redeemers cannot both succeed
        let Some(client_id) = self.find_client_id_by_code(code) else {
            return Ok(None);
        };
        Ok(self
            .pending
            .remove_if(&client_id, |_, p| p.code == code)
            .map(|(_, p)| p))
    }
}
