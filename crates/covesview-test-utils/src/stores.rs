use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::DataServerClient;
use covesview_core::types::StrongRef;
use covesview_storage_sqlite::store::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;

/// A fresh [`SqliteStore`] backed by a tempdir database, plus a tempdir for
/// the image proxy cache. Held alive for the test's duration.
pub struct TestStores {
    pub store: SqliteStore,
    pub image_cache_path: std::path::PathBuf,
    /// Hold the TempDir to keep it alive for the test's duration.
    pub _tempdir: TempDir,
}

/// Create a fresh store backed by a tempdir. Runs migrations, same as
/// production startup.
pub async fn create_test_stores() -> TestStores {
    let tempdir = TempDir::new().expect("failed to create tempdir");
    let db_path = tempdir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let store = SqliteStore::connect(&db_url).await.expect("failed to connect store");

    let image_cache_path = tempdir.path().join("image-cache");
    std::fs::create_dir_all(&image_cache_path).expect("failed to create image cache dir");

    TestStores {
        store,
        image_cache_path,
        _tempdir: tempdir,
    }
}

/// In-memory data-server client for exercising the RPC surface without a
/// real actor data server. `fail_conflict` makes the next `put_record` call
/// with a `swap_cid` set return `AppError::Conflict`.
#[derive(Default)]
pub struct FakeDataServer {
    pub records: Mutex<HashMap<(String, String, String), Value>>,
    pub fail_conflict: Mutex<bool>,
}

#[async_trait]
impl DataServerClient for FakeDataServer {
    async fn get_record(
        &self,
        _data_server: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<Option<Value>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(did.to_string(), collection.to_string(), rkey.to_string()))
            .cloned())
    }

    async fn put_record(
        &self,
        _data_server: &str,
        _access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
        record: Value,
        swap_cid: Option<&str>,
    ) -> AppResult<StrongRef> {
        if swap_cid.is_some() && *self.fail_conflict.lock().unwrap() {
            return Err(AppError::Conflict(format!("concurrent modification at {collection}/{rkey}")));
        }
        self.records
            .lock()
            .unwrap()
            .insert((did.to_string(), collection.to_string(), rkey.to_string()), record);
        Ok(StrongRef {
            uri: format!("at://{did}/{collection}/{rkey}"),
            cid: format!("bafyfake{rkey}"),
        })
    }

    async fn delete_record(
        &self,
        _data_server: &str,
        _access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<()> {
        self.records
            .lock()
            .unwrap()
            .remove(&(did.to_string(), collection.to_string(), rkey.to_string()));
        Ok(())
    }

    async fn upload_blob(
        &self,
        _data_server: &str,
        _access_token: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Value> {
        Ok(json!({
            "ref": { "$link": format!("bafyblob{}", bytes.len()) },
            "mimeType": mime_type,
            "size": bytes.len(),
        }))
    }
}
