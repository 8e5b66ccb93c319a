//! Sync request and status handlers.

use super::{SyncRequest, SyncStatusResponse};
use crate::api::AppState;
use crate::types::CredentialId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /sync - Queue a board import
///
/// 202 once queued, 404 for an unknown credential, 409 while the credential
/// is already syncing, 503 during shutdown.
pub async fn request_sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Response {
    if request.board_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(crate::error::ApiError::validation("board_id must not be empty")),
        )
            .into_response();
    }

    match state
        .sync
        .request_sync(request.credential_id, request.board_id)
        .await
    {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response(),
        Err(e) => {
            tracing::debug!(
                credential_id = %request.credential_id,
                error = %e,
                "sync request rejected"
            );
            e.into_response()
        }
    }
}

/// GET /credentials/:id/sync - Syncing flag of a credential
pub async fn credential_sync_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.sync.credential(CredentialId(id)).await {
        Ok(credential) => Json(SyncStatusResponse {
            credential_id: credential.id,
            syncing: credential.syncing,
            last_synced_at: credential.last_synced_at,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}
