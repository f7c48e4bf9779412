use axum::Json;
use axum::extract::{Query, State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_core::types::StrongRef;
use covesview_write::embed::ImageUpload;
use covesview_write::post::{self, NewPost, Writer};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::error::XrpcError;
use crate::routes::common::writer_context;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageUploadRequest {
    pub alt: String,
    pub mime_type: String,
    /// Base64-encoded blob bytes (JSON has no binary type).
    pub bytes_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub community: String,
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageUploadRequest>,
}

#[derive(Debug, Serialize)]
pub struct StrongRefResponse {
    pub uri: String,
    pub cid: String,
}

impl From<StrongRef> for StrongRefResponse {
    fn from(r: StrongRef) -> Self {
        Self { uri: r.uri, cid: r.cid }
    }
}

pub async fn create_post<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<StrongRefResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;

    let mut images = Vec::with_capacity(body.images.len());
    for image in body.images {
        let bytes = STANDARD
            .decode(image.bytes_base64)
            .map_err(|e| AppError::Validation(format!("invalid base64 image bytes: {e}")))?;
        images.push(ImageUpload {
            alt: image.alt,
            mime_type: image.mime_type,
            bytes,
        });
    }

    // Aggregators are indexed actors in their own right; a caller whose DID
    // resolves to an aggregator row writes under the community's own repo.
    let writer = if state.store.get_aggregator_by_did(&user.did).await?.is_some() {
        Writer::Aggregator {
            aggregator_did: user.did.clone(),
            access_token: ctx.access_token,
        }
    } else {
        Writer::User {
            did: user.did.clone(),
            access_token: ctx.access_token,
        }
    };

    let strong_ref = post::create_post(
        state.store.as_ref(),
        state.dataserver.as_ref(),
        &state.tid,
        writer,
        &body.community,
        NewPost {
            title: body.title,
            content: body.content,
            images,
        },
    )
    .await?;

    Ok(Json(strong_ref.into()))
}

#[derive(Debug, Deserialize)]
pub struct GetPostQuery {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub community_did: String,
    pub title: String,
    pub content: Option<String>,
    pub embed: Option<serde_json::Value>,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    pub score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub viewer: Option<covesview_read::ViewerVote>,
}

pub async fn get_post<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<GetPostQuery>,
) -> Result<Json<PostResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let post = state
        .store
        .get_post_by_uri(&query.uri)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no post {}", query.uri)))?;
    let viewer_did = viewer.as_ref().map(|u| u.did.as_str());
    let viewer_vote = covesview_read::viewer_vote(state.store.as_ref(), viewer_did, &post.uri).await?;

    Ok(Json(PostResponse {
        uri: post.uri,
        cid: post.cid,
        author_did: post.author_did,
        community_did: post.community_did,
        title: post.title,
        content: post.content,
        embed: post.embed,
        upvote_count: post.upvote_count,
        downvote_count: post.downvote_count,
        comment_count: post.comment_count,
        score: post.score,
        created_at: post.created_at,
        viewer: viewer_vote,
    }))
}
