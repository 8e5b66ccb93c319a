//! Sync credential CRUD and the syncing flag.

use crate::credentials::{CredentialStore, SyncCredential};
use crate::error::DatabaseError;
use crate::types::CredentialId;
use crate::{Error, Result};
use async_trait::async_trait;

use super::{CredentialRow, Database};

impl Database {
    /// Insert a new credential
    pub async fn insert_credential(&self, owner: &str, api_token: &str) -> Result<CredentialId> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO sync_credentials (owner, api_token, syncing, created_at)
            VALUES (?, ?, 0, ?)
            "#,
        )
        .bind(owner)
        .bind(api_token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert credential: {}",
                e
            )))
        })?;

        Ok(CredentialId(result.last_insert_rowid()))
    }

    /// Get a credential by ID
    pub async fn get_credential(&self, id: CredentialId) -> Result<Option<CredentialRow>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, owner, api_token, syncing, last_synced_at, created_at
            FROM sync_credentials
            WHERE id = ?
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get credential: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Atomically set the syncing flag if it is clear
    ///
    /// Returns `Ok(false)` when another run already holds the flag.
    pub async fn try_begin_sync(&self, id: CredentialId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_credentials
            SET syncing = 1
            WHERE id = ? AND syncing = 0
            "#,
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set syncing flag: {}",
                e
            )))
        })?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Zero rows: either the flag was set or the credential does not exist
        match self.get_credential(id).await? {
            Some(_) => Ok(false),
            None => Err(Error::CredentialNotFound(id)),
        }
    }

    /// Clear the syncing flag; on success also stamp `last_synced_at`
    pub async fn end_sync(&self, id: CredentialId, succeeded: bool) -> Result<()> {
        let query = if succeeded {
            sqlx::query(
                r#"
                UPDATE sync_credentials
                SET syncing = 0, last_synced_at = ?
                WHERE id = ?
                "#,
            )
            .bind(chrono::Utc::now().timestamp())
        } else {
            sqlx::query("UPDATE sync_credentials SET syncing = 0 WHERE id = ?")
        };

        let result = query.bind(id.get()).execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to clear syncing flag: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::CredentialNotFound(id));
        }
        Ok(())
    }

    /// Clear syncing flags left set by a previous process
    ///
    /// Sync runs are not replayed after a restart, so a flag that is still set
    /// at startup can only be a leftover. Returns the number of flags cleared.
    pub async fn reset_stale_sync_flags(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE sync_credentials SET syncing = 0 WHERE syncing = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to reset syncing flags: {}",
                    e
                )))
            })?;

        let cleared = result.rows_affected();
        if cleared > 0 {
            tracing::warn!(cleared, "cleared syncing flags left by a previous run");
        }
        Ok(cleared)
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn get(&self, id: CredentialId) -> Result<SyncCredential> {
        self.get_credential(id)
            .await?
            .map(SyncCredential::from)
            .ok_or(Error::CredentialNotFound(id))
    }

    async fn try_begin_sync(&self, id: CredentialId) -> Result<bool> {
        Database::try_begin_sync(self, id).await
    }

    async fn end_sync(&self, id: CredentialId, succeeded: bool) -> Result<()> {
        Database::end_sync(self, id, succeeded).await
    }

    async fn is_syncing(&self, id: CredentialId) -> Result<bool> {
        Ok(CredentialStore::get(self, id).await?.syncing)
    }
}
