use axum::http::StatusCode;
use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};

use crate::auth::AuthenticatedUser;
use crate::error::XrpcError;
use crate::state::AppState;

/// The data server endpoint and bearer access token a write on behalf of
/// `user` should be sent with, resolved from the live OAuth session their
/// JWT names and the indexed user row.
pub struct WriterContext {
    pub data_server: String,
    pub access_token: String,
}

pub async fn writer_context<S, Sess>(
    state: &AppState<S, Sess>,
    user: &AuthenticatedUser,
) -> Result<WriterContext, XrpcError>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let session = state
        .sessions
        .get_session(&user.session_id)
        .await?
        .ok_or_else(|| {
            XrpcError::new(StatusCode::UNAUTHORIZED, "ExpiredToken", "session no longer exists")
        })?;

    let data_server = state
        .store
        .get_user_by_did(&user.did)
        .await?
        .map(|u| u.data_server)
        .ok_or_else(|| AppError::NotFound(format!("no indexed user {}", user.did)))?;

    Ok(WriterContext {
        data_server,
        access_token: session.access_token,
    })
}
