use axum::Json;
use axum::extract::State;
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_core::types::{Direction, StrongRef};
use covesview_write::vote;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::error::XrpcError;
use crate::routes::common::writer_context;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleVoteRequest {
    pub subject_uri: String,
    pub subject_cid: String,
    pub direction: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleVoteResponse {
    pub uri: Option<String>,
    pub cid: Option<String>,
}

pub async fn create_vote<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<ToggleVoteRequest>,
) -> Result<Json<ToggleVoteResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;
    let direction = Direction::parse(&body.direction)
        .ok_or_else(|| AppError::Validation(format!("unknown vote direction {:?}", body.direction)))?;

    let result = vote::toggle_vote(
        state.dataserver.as_ref(),
        &state.tid,
        &state.votes,
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        &StrongRef {
            uri: body.subject_uri,
            cid: body.subject_cid,
        },
        direction,
    )
    .await?;

    Ok(Json(match result {
        Some(strong_ref) => ToggleVoteResponse {
            uri: Some(strong_ref.uri),
            cid: Some(strong_ref.cid),
        },
        None => ToggleVoteResponse { uri: None, cid: None },
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveVoteRequest {
    pub subject_uri: String,
}

pub async fn delete_vote<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
    Json(body): Json<RemoveVoteRequest>,
) -> Result<Json<serde_json::Value>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let ctx = writer_context(&state, &user).await?;
    vote::remove_vote(
        state.dataserver.as_ref(),
        &state.votes,
        &user.did,
        &ctx.data_server,
        &ctx.access_token,
        &body.subject_uri,
    )
    .await?;
    Ok(Json(serde_json::json!({})))
}
