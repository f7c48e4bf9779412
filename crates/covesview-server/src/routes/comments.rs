use axum::Json;
use axum::extract::{Query, State};
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_core::types::StrongRef;
use covesview_read::{CommentNode, CommentSort};
use covesview_write::comment::{self, NewComment};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::error::XrpcError;
use crate::routes::common::writer_context;
use crate::routes::posts::StrongRefResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub root_uri: String,
    pub root_cid: String,
    pub parent_uri: Option<String>,
    pub parent_cid: Option<String>,
    pub content: String,
}

pub async fn create_comment<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentRequest>,
) -> Result<Json<StrongRefResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;

    let parent = match (body.parent_uri, body.parent_cid) {
        (Some(uri), Some(cid)) => Some(StrongRef { uri, cid }),
        _ => None,
    };

    let strong_ref = comment::create_comment(
        state.store.as_ref(),
        state.dataserver.as_ref(),
        &state.tid,
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        NewComment {
            root: StrongRef {
                uri: body.root_uri,
                cid: body.root_cid,
            },
            parent,
            content: body.content,
        },
    )
    .await?;

    Ok(Json(strong_ref.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub uri: String,
    pub content: String,
}

pub async fn update_comment<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<StrongRefResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;
    let strong_ref = comment::update_comment(
        state.store.as_ref(),
        state.dataserver.as_ref(),
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        &body.uri,
        body.content,
    )
    .await?;
    Ok(Json(strong_ref.into()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    pub uri: String,
}

pub async fn delete_comment<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<DeleteCommentRequest>,
) -> Result<Json<serde_json::Value>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;
    comment::delete_comment(
        state.store.as_ref(),
        state.dataserver.as_ref(),
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        &body.uri,
    )
    .await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct GetCommentTreeQuery {
    pub uri: String,
    pub sort: Option<String>,
    pub timeframe: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_depth() -> u32 {
    10
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct CommentTreeResponse {
    pub comments: Vec<CommentNode>,
}

pub async fn get_comment_tree<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<GetCommentTreeQuery>,
) -> Result<Json<CommentTreeResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let sort = CommentSort::parse(query.sort.as_deref().unwrap_or("new"), query.timeframe.as_deref())
        .ok_or_else(|| AppError::Validation(format!("unknown sort {:?}", query.sort)))?;
    let viewer_did = viewer.as_ref().map(|u| u.did.as_str());

    let comments = covesview_read::assemble_comment_tree(
        state.store.as_ref(),
        &query.uri,
        sort,
        viewer_did,
        query.depth,
        query.limit,
    )
    .await?;

    Ok(Json(CommentTreeResponse { comments }))
}
