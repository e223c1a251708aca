//! SQLite storage implementation
//!
//! Provides persistent storage for client records and pending authorization
//! attempts using SQLite.

use super::*;
use crate::TickergateError;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage
    ///
    /// # Arguments
    /// * `dsn` - Database path (e.g., ".tickergate/auth.db" or ":memory:" for in-memory)
    pub async fn new(dsn: &str) -> Result<Self> {
        // Prepend sqlite: prefix if not present and add create-if-missing option
        let connection_string = if dsn.starts_with("sqlite:") {
            if dsn.contains('?') {
                dsn.to_string()
            } else {
                format!("{}?mode=rwc", dsn)
            }
        } else {
            format!("sqlite:{}?mode=rwc", dsn)
        };

        // Extract actual file path for directory creation
        let file_path = dsn.strip_prefix("sqlite:").unwrap_or(dsn);

        // Validate path to prevent directory traversal attacks
        if file_path.contains("..") {
            return Err(TickergateError::config(
                "Database path cannot contain '..' (path traversal not allowed)",
            ));
        }

        // Create parent directory if needed (unless it's :memory:)
        if file_path != ":memory:"
            && let Some(parent) = Path::new(file_path).parent()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePool::connect(&connection_string)
            .await
            .map_err(|e| TickergateError::storage(format!("Failed to connect to SQLite: {}", e)))?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .map_err(|e| TickergateError::storage(format!("Failed to run migrations: {}", e)))?;

        Ok(Self { pool })
    }

    fn parse_client(row: &SqliteRow) -> Result<ClientRecord> {
        Ok(ClientRecord {
            client_id: row.try_get("client_id")?,
            client_secret: row.try_get("client_secret")?,
            client_name: row.try_get("client_name")?,
            redirect_uris: serde_json::from_str(&row.try_get::<String, _>("redirect_uris")?)
                .map_err(crate::StorageError::from)?,
            created_at: DateTime::from_timestamp(row.try_get("created_at")?, 0)
                .unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.try_get("updated_at")?, 0)
                .unwrap_or_else(Utc::now),
        })
    }

    fn parse_pending(row: &SqliteRow) -> Result<PendingAuthorization> {
        Ok(PendingAuthorization {
            client_id: row.try_get("client_id")?,
            code: row.try_get("code")?,
            code_challenge: row.try_get("code_challenge")?,
            scope: row.try_get("scope")?,
            created_at: DateTime::from_timestamp(row.try_get("created_at")?, 0)
                .unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    // Client methods
    async fn save_client(&self, client: &ClientRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO clients (client_id, client_secret, client_name, redirect_uris, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                client_secret = excluded.client_secret,
                client_name = excluded.client_name,
                redirect_uris = excluded.redirect_uris,
                updated_at = excluded.updated_at",
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(&client.client_name)
        .bind(serde_json::to_string(&client.redirect_uris).map_err(crate::StorageError::from)?)
        .bind(client.created_at.timestamp())
        .bind(client.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRecord>> {
        let row = sqlx::query(
            "SELECT client_id, client_secret, client_name, redirect_uris, created_at, updated_at
             FROM clients WHERE client_id = ?",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::parse_client(&row)?)),
            None => Ok(None),
        }
    }

    // Pending authorization methods
    async fn put_pending(&self, pending: &PendingAuthorization) -> Result<()> {
        // Single upsert keyed by client_id: the replacement is atomic at the
        // database level, so concurrent authorize calls cannot tear an attempt
        sqlx::query(
            "INSERT INTO pending_authorizations (client_id, code, code_challenge, scope, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                code = excluded.code,
                code_challenge = excluded.code_challenge,
                scope = excluded.scope,
                created_at = excluded.created_at",
        )
        .bind(&pending.client_id)
        .bind(&pending.code)
        .bind(&pending.code_challenge)
        .bind(&pending.scope)
        .bind(pending.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pending_by_client(
        &self,
        client_id: &str,
    ) -> Result<Option<PendingAuthorization>> {
        let row = sqlx::query(
            "SELECT client_id, code, code_challenge, scope, created_at
             FROM pending_authorizations WHERE client_id = ?",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::parse_pending(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>> {
        let row = sqlx::query(
            "SELECT client_id, code, code_challenge, scope, created_at
             FROM pending_authorizations WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::parse_pending(&row)?)),
            None => Ok(None),
        }
    }

    async fn take_pending_by_code(&self, code: &str) -> Result<Option<PendingAuthorization>> {
        // DELETE ... RETURNING is a single statement: exactly one caller can
        // observe the row, which enforces single-use redemption
        let row = sqlx::query(
            "DELETE FROM pending_authorizations WHERE code = ?
             RETURNING client_id, code, code_challenge, scope, created_at",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::parse_pending(&row)?)),
            None => Ok(None),
        }
    }
}
