//! Test configuration and host construction

use coursesync::config::RetryConfig;
use coursesync::sync::InMemoryContent;
use coursesync::{Config, ContentFactories, CourseSync, Database};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Application key the mock board service expects
pub const API_KEY: &str = "test-app-key";

/// Configuration pointing at a mock board service, with files under `dir`
pub fn test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.trello.base_url = base_url.to_string();
    config.trello.api_key = API_KEY.to_string();
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 1.0,
        jitter: false,
    };
    config.queue.shutdown_grace = Duration::from_secs(5);
    config.storage.attachment_dir = dir.path().join("attachments");
    config.persistence.database_path = dir.path().join("coursesync.db");
    config.api.bind_address = "127.0.0.1:0".parse().expect("valid address");
    config
}

/// A started host backed by SQLite, plus handles the tests inspect
pub struct TestHost {
    /// The host
    pub sync: CourseSync,
    /// The credential database
    pub db: Arc<Database>,
    /// Recorded content
    pub content: Arc<InMemoryContent>,
    /// Keeps the database and attachments alive
    pub dir: TempDir,
}

/// Create and start a host for a mock board service at `base_url`
pub async fn start_host(base_url: &str) -> TestHost {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(base_url, &dir);

    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("open database"),
    );
    let content = Arc::new(InMemoryContent::new());

    let sync = CourseSync::with_database(config, db.clone(), ContentFactories::shared(content.clone()))
        .await
        .expect("create host");
    sync.start().await.expect("start host");

    TestHost {
        sync,
        db,
        content,
        dir,
    }
}
