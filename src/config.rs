//! Configuration types for coursesync

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Main configuration for [`CourseSync`](crate::CourseSync)
///
/// Fields are organized into logical sub-configs:
/// - [`http`](HttpConfig) - outbound client timeout and user agent
/// - [`retry`](RetryConfig) - retry count and backoff for outbound calls
/// - [`rate_limit`](RateLimitConfig) - fixed-window limiter shared by one client
/// - [`queue`](QueueConfig) - background queue capacity and shutdown grace
/// - [`trello`](TrelloConfig) - board service endpoint and API key
/// - [`storage`](StorageConfig) - where downloaded attachments are written
/// - [`persistence`](PersistenceConfig) - credential database
/// - [`api`](ApiConfig) - REST surface
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry behavior for outbound calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Fixed-window rate limiting for outbound calls
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Background queue settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Board service settings
    #[serde(default)]
    pub trello: TrelloConfig,

    /// Attachment storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Check values that would make the runtime misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.rate_limit.permits == 0 {
            return Err(crate::Error::Config {
                message: "rate limit must allow at least one permit per window".into(),
                key: Some("rate_limit.permits".into()),
            });
        }
        if self.rate_limit.window.is_zero() {
            return Err(crate::Error::Config {
                message: "rate limit window must be non-zero".into(),
                key: Some("rate_limit.window".into()),
            });
        }
        if self.queue.capacity == 0 {
            return Err(crate::Error::Config {
                message: "queue capacity must be at least 1".into(),
                key: Some("queue.capacity".into()),
            });
        }
        if url::Url::parse(&self.trello.base_url).is_err() {
            return Err(crate::Error::Config {
                message: format!("invalid board service URL '{}'", self.trello.base_url),
                key: Some("trello.base_url".into()),
            });
        }
        Ok(())
    }
}

/// Outbound HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-attempt request timeout (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for failed outbound calls
///
/// The defaults give a fixed 1 s backoff: multiplier 1.0 and no jitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt when a request does not override it (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1000 ms)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Fixed-window rate limiter configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Permits handed out per window (default: 100)
    #[serde(default = "default_permits")]
    pub permits: u32,

    /// Window length (default: 10 seconds)
    #[serde(default = "default_window", with = "duration_serde")]
    pub window: Duration,

    /// Callers allowed to wait for the next window (default: 10)
    #[serde(default = "default_queue_limit")]
    pub queue_limit: u32,

    /// Sleep before retrying when both permits and wait queue are exhausted (default: 100 ms)
    #[serde(default = "default_contention_backoff", with = "duration_serde")]
    pub contention_backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permits: default_permits(),
            window: default_window(),
            queue_limit: default_queue_limit(),
            contention_backoff: default_contention_backoff(),
        }
    }
}

/// Background queue configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued work items before producers block (default: 100)
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// How long shutdown waits for the running item (default: 30 seconds)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    pub shutdown_grace: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Board service (Trello REST API) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrelloConfig {
    /// API base URL (default: "https://api.trello.com")
    #[serde(default = "default_trello_base_url")]
    pub base_url: String,

    /// Application API key sent with every request
    #[serde(default)]
    pub api_key: String,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            base_url: default_trello_base_url(),
            api_key: String::new(),
        }
    }
}

/// Attachment storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored attachments (default: "./attachments")
    #[serde(default = "default_attachment_dir")]
    pub attachment_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachment_dir: default_attachment_dir(),
        }
    }
}

/// Credential persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./coursesync.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the API server to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("coursesync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_permits() -> u32 {
    100
}

fn default_window() -> Duration {
    Duration::from_secs(10)
}

fn default_queue_limit() -> u32 {
    10
}

fn default_contention_backoff() -> Duration {
    Duration::from_millis(100)
}

fn default_queue_capacity() -> usize {
    100
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_trello_base_url() -> String {
    "https://api.trello.com".to_string()
}

fn default_attachment_dir() -> PathBuf {
    PathBuf::from("./attachments")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./coursesync.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

// Duration serialization helper (milliseconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
