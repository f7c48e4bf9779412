//! Per-viewer decoration attached to posts and comments: the viewer's own
//! vote on that item, when the request is authenticated.

use covesview_core::error::AppResult;
use covesview_core::traits::RecordStore;
use covesview_core::types::Direction;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ViewerVote {
    pub direction: Direction,
    pub uri: String,
}

/// Look up `voter_did`'s vote on `subject_uri`, if any. `voter_did` is
/// `None` for unauthenticated requests, which always decorate as `None`.
pub async fn viewer_vote(
    store: &dyn RecordStore,
    voter_did: Option<&str>,
    subject_uri: &str,
) -> AppResult<Option<ViewerVote>> {
    let Some(voter_did) = voter_did else {
        return Ok(None);
    };
    let vote = store.get_vote(voter_did, subject_uri).await?;
    Ok(vote.map(|v| ViewerVote {
        direction: v.direction,
        uri: v.uri,
    }))
}
