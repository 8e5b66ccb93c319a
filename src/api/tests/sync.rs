use super::*;
use serde_json::json;

fn post_sync(body: serde_json::Value) -> Request<Body> {
    Request::post("/sync")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_sync_request_is_accepted() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(post_sync(json!({ "credential_id": app.credential, "board_id": "b1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await, json!({ "status": "accepted" }));
    // no consumer loop is running, so the item waits in the queue
    assert_eq!(app.sync.queued(), 1);
}

#[tokio::test]
async fn test_sync_request_conflicts_while_syncing() {
    let app = create_test_app(Config::default()).await;
    app.credentials.try_begin_sync(app.credential).await.unwrap();
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(post_sync(json!({ "credential_id": app.credential, "board_id": "b1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "sync_in_progress");
    assert_eq!(app.sync.queued(), 0);
}

#[tokio::test]
async fn test_sync_request_unknown_credential() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(post_sync(json!({ "credential_id": 999, "board_id": "b1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "credential_not_found");
    assert_eq!(json["error"]["details"]["credential_id"], 999);
}

#[tokio::test]
async fn test_sync_request_rejects_blank_board() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(post_sync(json!({ "credential_id": app.credential, "board_id": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_sync_request_after_shutdown() {
    let app = create_test_app(Config::default()).await;
    app.sync.shutdown().await.unwrap();
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(post_sync(json!({ "credential_id": app.credential, "board_id": "b1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_credential_sync_status() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let uri = format!("/credentials/{}/sync", app.credential);
    let response = router
        .clone()
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["credential_id"], app.credential.get());
    assert_eq!(json["syncing"], false);
    assert!(json["last_synced_at"].is_null());

    app.credentials.try_begin_sync(app.credential).await.unwrap();
    let response = router
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["syncing"], true);
}

#[tokio::test]
async fn test_credential_sync_status_not_found() {
    let app = create_test_app(Config::default()).await;
    let router = create_router(app.sync.clone());

    let response = router
        .oneshot(Request::get("/credentials/42/sync").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
