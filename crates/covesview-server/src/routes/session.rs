use axum::Json;
use axum::extract::State;
use chrono::{Duration as ChronoDuration, Utc};
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_core::types::OAuthSession;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::XrpcError;
use crate::state::AppState;

/// The bearer credential a caller already holds from their own data
/// server's authorization flow. This endpoint exchanges it for a short-lived
/// local session, per spec 4.3.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub did: String,
    pub handle: String,
    pub access_token: String,
    pub dpop_jkt: Option<String>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
}

fn default_ttl_secs() -> i64 {
    3600
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub token: String,
    pub did: String,
    pub handle: String,
}

pub async fn create_session<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    state
        .sessions
        .create_session(&OAuthSession {
            session_id: session_id.clone(),
            account_did: body.did.clone(),
            handle: body.handle.clone(),
            access_token: body.access_token,
            dpop_jkt: body.dpop_jkt,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(body.ttl_secs),
        })
        .await?;

    let token = covesview_crypto::create_session_token(
        &body.did,
        &session_id,
        &state.config.session.jwt_secret,
        state.config.session.session_ttl_secs,
    )?;

    Ok(Json(CreateSessionResponse {
        token,
        did: body.did,
        handle: body.handle,
    }))
}

pub async fn delete_session<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    state.sessions.delete_session(&user.session_id).await?;
    Ok(Json(serde_json::json!({})))
}
