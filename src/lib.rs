//! # coursesync
//!
//! Background task execution and rate-limited course import from external
//! boards.
//!
//! - **Executors** - a name-keyed registry of queued and inline strategies,
//!   a single consumer loop, per-item dependency scopes
//! - **Outbound HTTP** - one client with URL templating, a fixed-window rate
//!   limiter and bounded retries
//! - **Board sync** - imports a board's lists and cards as a course with
//!   sections, lessons and quizzes, single-flight per credential
//! - **Event-driven** - consumers subscribe to events, queued failures are
//!   never rethrown
//!
//! ## Quick Start
//!
//! ```no_run
//! use coursesync::{Collaborators, Config, ContentFactories, CourseSync};
//! use coursesync::credentials::InMemoryCredentialStore;
//! use coursesync::storage::FsAttachmentStore;
//! use coursesync::sync::InMemoryContent;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.trello.api_key = "app-key".to_string();
//!
//!     let credentials = Arc::new(InMemoryCredentialStore::new());
//!     let credential = credentials.insert("instructor@example.com", "user-token").await;
//!
//!     let sync = CourseSync::new(
//!         config,
//!         Collaborators {
//!             credentials,
//!             factories: ContentFactories::shared(Arc::new(InMemoryContent::new())),
//!             storage: Arc::new(FsAttachmentStore::new("./attachments")),
//!         },
//!     )?;
//!     sync.start().await?;
//!
//!     let mut events = sync.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     sync.request_sync(credential, "board-id").await?;
//!
//!     coursesync::run_with_shutdown(sync).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Sync credentials and the syncing flag
pub mod credentials;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Background task execution
pub mod executor;
/// Rate-limited outbound HTTP
pub mod http;
/// Fixed-window rate limiting
pub mod rate_limiter;
/// Retry logic with backoff
pub mod retry;
/// The sync host
pub mod service;
/// Attachment storage
pub mod storage;
/// Board to course synchronization
pub mod sync;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialStore, InMemoryCredentialStore, SyncCredential};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use executor::{
    BackgroundExecutor, ExecutorRegistry, InlineExecutor, MethodDescriptor, QueueConsumerLoop,
    QueuedExecutor, TaskInvoker, TaskTarget,
};
pub use http::{RateLimitedClient, RequestSpec};
pub use rate_limiter::FixedWindowLimiter;
pub use service::{Collaborators, CourseSync};
pub use sync::{ContentFactories, ContentSyncPipeline};
pub use types::{CredentialId, Event, SyncReport, SyncStage};

/// Run the host until a termination signal arrives, then shut it down
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(sync: CourseSync) -> Result<()> {
    wait_for_signal().await;
    sync.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received Ctrl+C");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    }
}
