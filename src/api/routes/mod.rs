//! Route handlers for the REST API
//!
//! - [`sync`] - Sync requests and credential status
//! - [`system`] - Health

use crate::types::CredentialId;
use serde::{Deserialize, Serialize};

mod sync;
mod system;

pub use sync::*;
pub use system::*;

/// Body of `POST /sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Credential whose board is imported
    pub credential_id: CredentialId,
    /// Board to import
    pub board_id: String,
}

/// Response of `GET /credentials/:id/sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    /// The credential
    pub credential_id: CredentialId,
    /// True while a sync runs for it
    pub syncing: bool,
    /// When the last successful sync finished
    pub last_synced_at: Option<chrono::DateTime<chrono::Utc>>,
}
