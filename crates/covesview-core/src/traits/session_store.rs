use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::OAuthSession;

/// Persists the opaque OAuth sessions issued by an actor's own
/// authorization server. This store never mints or validates tokens; it
/// only remembers them long enough to make authenticated calls back to the
/// actor's data server on their behalf.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn create_session(&self, session: &OAuthSession) -> AppResult<()>;
    async fn get_session(&self, session_id: &str) -> AppResult<Option<OAuthSession>>;
    async fn delete_session(&self, session_id: &str) -> AppResult<()>;
    async fn delete_sessions_for_did(&self, did: &str) -> AppResult<u64>;

    /// Propagate a handle change across every live session for this DID, so
    /// a stale handle never leaks back out through an authenticated call.
    async fn update_handle_for_sessions(&self, did: &str, new_handle: &str) -> AppResult<()>;
}
