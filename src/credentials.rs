//! Sync credentials and the single-flight syncing flag
//!
//! A [`SyncCredential`] is an account on the external board service. Its
//! `syncing` flag is the persisted half of the sync guard: a store must set
//! it with an atomic compare-and-set in [`CredentialStore::try_begin_sync`].

use crate::error::{Error, Result};
use crate::types::CredentialId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// An external board account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCredential {
    /// Credential identifier
    pub id: CredentialId,
    /// Owner of the account in this system
    pub owner: String,
    /// Token for the board service
    #[serde(skip_serializing, default)]
    pub api_token: String,
    /// True while a sync pipeline holds this credential
    pub syncing: bool,
    /// When the last successful sync finished
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Storage of credentials and their syncing flag
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a credential
    ///
    /// # Errors
    /// [`Error::CredentialNotFound`] when no such credential exists
    async fn get(&self, id: CredentialId) -> Result<SyncCredential>;

    /// Set `syncing` if it is currently clear
    ///
    /// Returns false when the flag was already set. Must be atomic with
    /// respect to concurrent callers.
    async fn try_begin_sync(&self, id: CredentialId) -> Result<bool>;

    /// Clear `syncing`; a successful run also records `last_synced_at`
    async fn end_sync(&self, id: CredentialId, succeeded: bool) -> Result<()>;

    /// Current value of the flag
    async fn is_syncing(&self, id: CredentialId) -> Result<bool>;
}

/// In-memory [`CredentialStore`] for tests and embedding
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<CredentialId, SyncCredential>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential and return its id
    pub async fn insert(&self, owner: impl Into<String>, api_token: impl Into<String>) -> CredentialId {
        let mut credentials = self.credentials.write().await;
        let id = CredentialId(credentials.keys().map(|k| k.get()).max().unwrap_or(0) + 1);
        credentials.insert(
            id,
            SyncCredential {
                id,
                owner: owner.into(),
                api_token: api_token.into(),
                syncing: false,
                last_synced_at: None,
            },
        );
        id
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, id: CredentialId) -> Result<SyncCredential> {
        self.credentials
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::CredentialNotFound(id))
    }

    async fn try_begin_sync(&self, id: CredentialId) -> Result<bool> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(&id)
            .ok_or(Error::CredentialNotFound(id))?;
        if credential.syncing {
            return Ok(false);
        }
        credential.syncing = true;
        Ok(true)
    }

    async fn end_sync(&self, id: CredentialId, succeeded: bool) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(&id)
            .ok_or(Error::CredentialNotFound(id))?;
        credential.syncing = false;
        if succeeded {
            credential.last_synced_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn is_syncing(&self, id: CredentialId) -> Result<bool> {
        Ok(self.get(id).await?.syncing)
    }
}
