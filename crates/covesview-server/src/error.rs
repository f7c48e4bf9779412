use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use covesview_core::error::AppError;
use covesview_imageproxy::ImageProxyError;
use serde_json::json;

#[derive(Debug)]
pub struct XrpcError {
    pub status: StatusCode,
    pub error_name: String,
    pub message: String,
}

impl XrpcError {
    pub fn new(status: StatusCode, error_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_name: error_name.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for XrpcError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error_name,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for XrpcError {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::Validation(_) => {
                XrpcError::new(StatusCode::BAD_REQUEST, "InvalidRequest", err.to_string())
            }
            AppError::Authentication(_) => XrpcError::new(
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                err.to_string(),
            ),
            AppError::Authorization(_) => {
                XrpcError::new(StatusCode::FORBIDDEN, "AuthorizationError", err.to_string())
            }
            AppError::NotFound(_) => XrpcError::new(StatusCode::NOT_FOUND, "NotFound", err.to_string()),
            AppError::Conflict(_) => XrpcError::new(StatusCode::CONFLICT, "Conflict", err.to_string()),
            AppError::RateLimited(_) => XrpcError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                err.to_string(),
            ),
            AppError::Upstream(_) => {
                XrpcError::new(StatusCode::BAD_GATEWAY, "UpstreamFailure", err.to_string())
            }
            AppError::Storage(_) | AppError::Internal(_) => XrpcError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                err.to_string(),
            ),
        }
    }
}

/// Wraps an [`ImageProxyError`] for the `/img/...` route handler. Unlike
/// [`XrpcError`], its body is always plain text, never JSON — the image
/// proxy's error surface isn't part of the RPC vocabulary the rest of this
/// server speaks.
pub struct ImageProxyRejection(pub ImageProxyError);

impl From<ImageProxyError> for ImageProxyRejection {
    fn from(err: ImageProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ImageProxyRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.to_string()).into_response()
    }
}
