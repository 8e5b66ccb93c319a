use crate::db::*;
use crate::types::CredentialId;
use tempfile::NamedTempFile;

/// Querying after the pool is closed returns an error rather than hanging or panicking
#[tokio::test]
async fn test_get_credential_after_pool_close_returns_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db.insert_credential("owner", "tok").await.unwrap();
    assert!(db.get_credential(id).await.unwrap().is_some());

    db.pool().close().await;

    let result = db.get_credential(id).await;
    assert!(
        result.is_err(),
        "get_credential after pool close should return an error, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_try_begin_sync_after_pool_close_returns_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.pool().close().await;

    let result = db.try_begin_sync(CredentialId(1)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_close_consumes_handle() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let id = db.insert_credential("owner", "tok").await.unwrap();
    db.close().await;

    // reopening sees the committed row
    let db = Database::new(temp_file.path()).await.unwrap();
    assert!(db.get_credential(id).await.unwrap().is_some());
}
