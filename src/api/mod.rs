//! REST API server module
//!
//! A small axum surface over [`CourseSync`]: accept sync requests and report
//! the syncing flag of a credential.

use crate::{CourseSync, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router
///
/// # Routes
///
/// - `POST /sync` - Queue a board import (`{credential_id, board_id}`), 202 when accepted
/// - `GET /credentials/:id/sync` - Syncing flag and last successful sync of a credential
/// - `GET /health` - Health check
pub fn create_router(sync: CourseSync) -> Router {
    let state = AppState::new(sync);

    Router::new()
        .route("/sync", post(routes::request_sync))
        .route("/credentials/:id/sync", get(routes::credential_sync_status))
        .route("/health", get(routes::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the API server on the configured bind address
///
/// Runs until the server stops or fails.
pub async fn start_api_server(sync: CourseSync) -> Result<()> {
    let bind_address = sync.config().api.bind_address;

    tracing::info!(address = %bind_address, "starting API server");

    let app = create_router(sync);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
