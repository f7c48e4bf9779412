use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::Identity;

/// Caches resolved identities so repeated lookups of the same handle or DID
/// don't re-hit DNS, the HTTPS well-known endpoint, or the DID directory.
#[async_trait]
pub trait IdentityCacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> AppResult<Option<Identity>>;
    async fn put(&self, key: &str, identity: &Identity) -> AppResult<()>;
    async fn invalidate(&self, key: &str) -> AppResult<()>;
}
