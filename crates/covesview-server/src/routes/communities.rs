use axum::Json;
use axum::extract::{Query, State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_write::community::{self, CommunityUpdate};
use covesview_write::embed::ImageUpload;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::error::XrpcError;
use crate::routes::common::writer_context;
use crate::routes::posts::StrongRefResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageUploadRequest {
    pub mime_type: String,
    pub bytes_base64: String,
    #[serde(default)]
    pub alt: String,
}

fn decode_image(upload: Option<ImageUploadRequest>) -> Result<Option<ImageUpload>, XrpcError> {
    let Some(upload) = upload else { return Ok(None) };
    let bytes = STANDARD
        .decode(upload.bytes_base64)
        .map_err(|e| AppError::Validation(format!("invalid base64 image bytes: {e}")))?;
    Ok(Some(ImageUpload {
        alt: upload.alt,
        mime_type: upload.mime_type,
        bytes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommunityRequest {
    pub community: String,
    #[serde(default = "default_rkey")]
    pub rkey: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<ImageUploadRequest>,
    pub banner: Option<ImageUploadRequest>,
}

fn default_rkey() -> String {
    "self".to_string()
}

pub async fn update_community<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateCommunityRequest>,
) -> Result<Json<StrongRefResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;

    let strong_ref = community::update_community(
        state.store.as_ref(),
        state.dataserver.as_ref(),
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        &body.community,
        &body.rkey,
        CommunityUpdate {
            display_name: body.display_name,
            description: body.description,
            avatar: decode_image(body.avatar)?,
            banner: decode_image(body.banner)?,
        },
    )
    .await?;

    Ok(Json(strong_ref.into()))
}

#[derive(Debug, Deserialize)]
pub struct GetCommunityQuery {
    pub identifier: String,
}

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    pub did: String,
    pub handle: String,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub owner_did: String,
    pub visibility: &'static str,
    pub avatar_cid: Option<String>,
    pub banner_cid: Option<String>,
    pub subscriber_count: i64,
    pub member_count: i64,
    pub viewer_subscribed: bool,
}

pub async fn get_community<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<GetCommunityQuery>,
) -> Result<Json<CommunityResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let community =
        covesview_read::resolve_community(state.store.as_ref(), &query.identifier, &state.config.instance_domain)
            .await?;

    let viewer_subscribed = match &viewer {
        Some(user) => state
            .store
            .get_subscription(&user.did, &community.did)
            .await?
            .is_some(),
        None => false,
    };

    Ok(Json(CommunityResponse {
        did: community.did,
        handle: community.handle,
        name: community.name,
        display_name: community.display_name,
        description: community.description,
        owner_did: community.owner_did,
        visibility: community.visibility.as_str(),
        avatar_cid: community.avatar_cid,
        banner_cid: community.banner_cid,
        subscriber_count: community.subscriber_count,
        member_count: community.member_count,
        viewer_subscribed,
    }))
}
