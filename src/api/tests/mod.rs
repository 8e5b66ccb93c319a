use super::*;
use crate::Config;
use crate::credentials::{CredentialStore, InMemoryCredentialStore};
use crate::service::Collaborators;
use crate::storage::FsAttachmentStore;
use crate::sync::{ContentFactories, InMemoryContent};
use crate::types::CredentialId;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

mod sync;

struct TestApp {
    sync: CourseSync,
    credentials: Arc<InMemoryCredentialStore>,
    credential: CredentialId,
    _dir: TempDir,
}

async fn create_test_app(config: Config) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let credential = credentials.insert("owner", "token").await;

    let sync = CourseSync::new(
        config,
        Collaborators {
            credentials: credentials.clone(),
            factories: ContentFactories::shared(Arc::new(InMemoryContent::new())),
            storage: Arc::new(FsAttachmentStore::new(dir.path())),
        },
    )
    .unwrap();

    TestApp {
        sync,
        credentials,
        credential,
        _dir: dir,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let app = create_test_app(config).await;

    let handle = app.sync.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    handle.abort();
}
