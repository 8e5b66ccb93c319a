use crate::credentials::CredentialStore;
use crate::db::*;
use crate::error::Error;
use crate::types::CredentialId;
use std::sync::Arc;
use tempfile::NamedTempFile;

async fn create_test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

#[tokio::test]
async fn test_insert_and_get_credential() {
    let (db, _temp) = create_test_db().await;

    let id = db.insert_credential("instructor@example.com", "tok-1").await.unwrap();
    let row = db.get_credential(id).await.unwrap().unwrap();

    assert_eq!(row.owner, "instructor@example.com");
    assert_eq!(row.api_token, "tok-1");
    assert_eq!(row.syncing, 0);
    assert!(row.last_synced_at.is_none());

    let credential = CredentialStore::get(&db, id).await.unwrap();
    assert_eq!(credential.id, id);
    assert!(!credential.syncing);
}

#[tokio::test]
async fn test_get_missing_credential() {
    let (db, _temp) = create_test_db().await;

    assert!(db.get_credential(CredentialId(99)).await.unwrap().is_none());
    let err = CredentialStore::get(&db, CredentialId(99)).await.unwrap_err();
    assert!(matches!(err, Error::CredentialNotFound(CredentialId(99))));
}

#[tokio::test]
async fn test_begin_sync_compare_and_set() {
    let (db, _temp) = create_test_db().await;
    let id = db.insert_credential("owner", "tok").await.unwrap();

    assert!(db.try_begin_sync(id).await.unwrap());
    assert!(!db.try_begin_sync(id).await.unwrap(), "second begin must fail");
    assert!(db.is_syncing(id).await.unwrap());

    db.end_sync(id, false).await.unwrap();
    assert!(!db.is_syncing(id).await.unwrap());
    assert!(db.try_begin_sync(id).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_begin_sync_has_one_winner() {
    let (db, _temp) = create_test_db().await;
    let id = db.insert_credential("owner", "tok").await.unwrap();
    let db = Arc::new(db);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move { db.try_begin_sync(id).await.unwrap() }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_begin_sync_unknown_credential() {
    let (db, _temp) = create_test_db().await;
    let err = db.try_begin_sync(CredentialId(5)).await.unwrap_err();
    assert!(matches!(err, Error::CredentialNotFound(CredentialId(5))));
}

#[tokio::test]
async fn test_end_sync_success_stamps_time() {
    let (db, _temp) = create_test_db().await;
    let id = db.insert_credential("owner", "tok").await.unwrap();

    db.try_begin_sync(id).await.unwrap();
    db.end_sync(id, true).await.unwrap();

    let credential = CredentialStore::get(&db, id).await.unwrap();
    assert!(!credential.syncing);
    assert!(credential.last_synced_at.is_some());
}

#[tokio::test]
async fn test_reset_stale_sync_flags() {
    let (db, _temp) = create_test_db().await;
    let a = db.insert_credential("a", "tok").await.unwrap();
    let b = db.insert_credential("b", "tok").await.unwrap();
    let c = db.insert_credential("c", "tok").await.unwrap();

    db.try_begin_sync(a).await.unwrap();
    db.try_begin_sync(b).await.unwrap();

    assert_eq!(db.reset_stale_sync_flags().await.unwrap(), 2);
    for id in [a, b, c] {
        assert!(!db.is_syncing(id).await.unwrap());
    }
    assert_eq!(db.reset_stale_sync_flags().await.unwrap(), 0);
}
