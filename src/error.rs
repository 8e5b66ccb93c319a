//! Error types for coursesync
//!
//! This module provides error handling for the library, including:
//! - The dispatch errors raised by the executor registry and task invoker
//! - External API failures carrying the remote status and body
//! - Sync pipeline errors wrapped with the stage that failed
//! - HTTP status code mapping and structured JSON error bodies for the API

use crate::types::{CredentialId, SyncStage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for coursesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for coursesync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "rate_limit.permits")
        key: Option<String>,
    },

    /// No executor registered under the requested name and no "default" fallback
    #[error("no executor available for '{name}' and no default executor registered")]
    NoExecutorAvailable {
        /// The executor name that was requested
        name: String,
    },

    /// The target type does not expose a method with this name
    #[error("method '{method}' not found on {target}")]
    MethodNotFound {
        /// Name of the target type
        target: String,
        /// Requested method name
        method: String,
    },

    /// The method exists but carries no executor declaration
    #[error("method '{method}' on {target} has no task declaration")]
    MissingTaskDeclaration {
        /// Name of the target type
        target: String,
        /// Method name lacking a declaration
        method: String,
    },

    /// Arguments could not be decoded for the invoked method
    #[error("invalid arguments for '{method}': {reason}")]
    InvalidArgs {
        /// Method that received the arguments
        method: String,
        /// Why decoding failed
        reason: String,
    },

    /// External service returned a failure after all retries
    #[error("external API error (status {}): {body}", display_status(.status))]
    ExternalApi {
        /// HTTP status code, None when the request never produced a response
        status: Option<u16>,
        /// Response body or transport error message
        body: String,
    },

    /// A sync is already running for this credential
    #[error("sync already in progress for credential {0}")]
    SyncInProgress(CredentialId),

    /// Sync pipeline failed; the syncing flag has been released
    #[error("sync for credential {credential} failed during {stage}: {source}")]
    SyncPipeline {
        /// Stage that was executing when the failure happened
        stage: SyncStage,
        /// Credential the run belonged to
        credential: CredentialId,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// A list needs a parent entity that no earlier list created
    #[error("list '{list}' requires a {parent} created by an earlier list")]
    MissingParent {
        /// Name of the list being processed
        list: String,
        /// Kind of parent that is missing ("course" or "section")
        parent: &'static str,
    },

    /// A scope was asked for a service nobody registered
    #[error("service '{0}' is not registered with the service provider")]
    ServiceNotRegistered(&'static str),

    /// Rate limiter refused a permit instead of waiting
    #[error("rate limiter exhausted: {0}")]
    RateLimiterExhausted(String),

    /// Credential not found in the credential store
    #[error("credential {0} not found")]
    CredentialNotFound(CredentialId),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL could not be built from a template
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL after placeholder substitution
        url: String,
        /// Parser message
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl Error {
    /// Innermost cause, unwrapping `SyncPipeline` layers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::SyncPipeline { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "sync_in_progress",
///     "message": "sync already in progress for credential 7",
///     "details": { "credential_id": 7 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidArgs { .. } => 400,
            Error::InvalidUrl { .. } => 400,

            Error::CredentialNotFound(_) => 404,
            Error::MethodNotFound { .. } => 404,

            Error::SyncInProgress(_) => 409,

            Error::MissingParent { .. } => 422,

            Error::RateLimiterExhausted(_) => 429,

            Error::NoExecutorAvailable { .. } => 500,
            Error::MissingTaskDeclaration { .. } => 500,
            Error::ServiceNotRegistered(_) => 500,
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            Error::ExternalApi { .. } => 502,
            Error::Network(_) => 502,
            Error::SyncPipeline { .. } => 502,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NoExecutorAvailable { .. } => "no_executor_available",
            Error::MethodNotFound { .. } => "method_not_found",
            Error::MissingTaskDeclaration { .. } => "missing_task_declaration",
            Error::InvalidArgs { .. } => "invalid_args",
            Error::ExternalApi { .. } => "external_api_error",
            Error::SyncInProgress(_) => "sync_in_progress",
            Error::SyncPipeline { .. } => "sync_pipeline_error",
            Error::MissingParent { .. } => "missing_parent",
            Error::ServiceNotRegistered(_) => "service_not_registered",
            Error::RateLimiterExhausted(_) => "rate_limited",
            Error::CredentialNotFound(_) => "credential_not_found",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Network(_) => "network_error",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::SyncInProgress(id) | Error::CredentialNotFound(id) => Some(serde_json::json!({
                "credential_id": id,
            })),
            Error::ExternalApi { status, .. } => Some(serde_json::json!({
                "upstream_status": status,
            })),
            Error::SyncPipeline {
                stage, credential, ..
            } => Some(serde_json::json!({
                "credential_id": credential,
                "stage": stage.to_string(),
            })),
            Error::MethodNotFound { target, method }
            | Error::MissingTaskDeclaration { target, method } => Some(serde_json::json!({
                "target": target,
                "method": method,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
