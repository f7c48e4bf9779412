use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_imageproxy::ImageResponse;

use crate::error::ImageProxyRejection;
use crate::state::AppState;

/// `/img/<preset>/plain/<did>/<cid>`, per spec 4.9.
pub async fn serve_image<S, Sess>(
    State(state): State<AppState<S, Sess>>,
    Path((preset, _plain, did, cid)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, ImageProxyRejection>
where
    S: RecordStore,
    Sess: SessionStore,
{
    let if_none_match = headers
        .get(axum::http::header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());

    let result = state.image_proxy.serve(&preset, &did, &cid, if_none_match).await?;

    Ok(match result {
        ImageResponse::Ok { body, etag } => {
            let mut response = (StatusCode::OK, body).into_response();
            let headers = response.headers_mut();
            headers.insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
            headers.insert(
                axum::http::header::ETAG,
                HeaderValue::from_str(&etag).unwrap_or_else(|_| HeaderValue::from_static("\"\"")),
            );
            headers.insert(
                axum::http::header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000, immutable"),
            );
            response
        }
        ImageResponse::NotModified { etag } => {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            let headers = response.headers_mut();
            headers.insert(
                axum::http::header::ETAG,
                HeaderValue::from_str(&etag).unwrap_or_else(|_| HeaderValue::from_static("\"\"")),
            );
            response
        }
    })
}
