//! Database layer for coursesync
//!
//! Handles SQLite persistence of sync credentials and their syncing flag.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`credentials`] - Credential CRUD and the atomic syncing flag

use crate::credentials::SyncCredential;
use crate::types::CredentialId;
use sqlx::{FromRow, sqlite::SqlitePool};

mod credentials;
mod migrations;

/// Credential record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRow {
    /// Unique database ID
    pub id: i64,
    /// Owner of the account
    pub owner: String,
    /// Token for the board service
    pub api_token: String,
    /// Syncing flag (0 = idle, 1 = syncing)
    pub syncing: i32,
    /// Unix timestamp of the last successful sync
    pub last_synced_at: Option<i64>,
    /// Unix timestamp when the credential was created
    pub created_at: i64,
}

impl From<CredentialRow> for SyncCredential {
    fn from(row: CredentialRow) -> Self {
        use chrono::{TimeZone, Utc};

        SyncCredential {
            id: CredentialId(row.id),
            owner: row.owner,
            api_token: row.api_token,
            syncing: row.syncing != 0,
            last_synced_at: row
                .last_synced_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }
}

/// Database handle for coursesync
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
