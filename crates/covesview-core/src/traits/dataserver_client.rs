use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;
use crate::types::StrongRef;

/// Calls out to an actor's own data server to read and write records on
/// their behalf. This AppView never holds repository signing keys; every
/// write is composed here and sent to the actor's server for signing and
/// storage, then observed back through the firehose.
#[async_trait]
pub trait DataServerClient: Send + Sync + 'static {
    async fn get_record(
        &self,
        data_server: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<Option<Value>>;

    /// `swap_cid`, when set, asks the data server to reject the write with a
    /// conflict unless the record's current CID still matches — optimistic
    /// concurrency for updates.
    async fn put_record(
        &self,
        data_server: &str,
        access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
        record: Value,
        swap_cid: Option<&str>,
    ) -> AppResult<StrongRef>;

    async fn delete_record(
        &self,
        data_server: &str,
        access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<()>;

    async fn upload_blob(
        &self,
        data_server: &str,
        access_token: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Value>;
}
