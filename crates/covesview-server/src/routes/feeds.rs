use axum::Json;
use axum::extract::{Query, State};
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_core::types::FeedSort;
use covesview_read::FeedPage;
use serde::Deserialize;

use crate::auth::OptionalAuth;
use crate::error::XrpcError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GetFeedQuery {
    pub community: String,
    pub sort: Option<String>,
    pub timeframe: Option<String>,
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    25
}

pub async fn get_feed<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<GetFeedQuery>,
) -> Result<Json<FeedPage>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let sort = FeedSort::parse(query.sort.as_deref().unwrap_or("new"), query.timeframe.as_deref())
        .ok_or_else(|| AppError::Validation(format!("unknown sort {:?}", query.sort)))?;

    let community_did =
        covesview_read::resolve_identifier(state.store.as_ref(), &query.community, &state.config.instance_domain)
            .await?;
    let viewer_did = viewer.as_ref().map(|u| u.did.as_str());

    let page = covesview_read::assemble_feed(
        state.store.as_ref(),
        state.config.session.cursor_secret.as_bytes(),
        &community_did,
        sort,
        viewer_did,
        query.cursor.as_deref(),
        query.limit,
    )
    .await?;

    Ok(Json(page))
}
