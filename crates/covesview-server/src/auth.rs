use axum::Extension;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::error::XrpcError;

/// The secret used to sign/verify this AppView's own session JWTs, added as
/// an Axum Extension so the extractors below work for any `AppState<S, Sess>`
/// instantiation without needing it as a type parameter.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Represents an authenticated viewer extracted from a valid JWT bearer
/// token minted by `session::create_session`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub did: String,
    pub session_id: String,
}

/// An optional authentication extractor. Returns `None` when no
/// Authorization header is present, rather than rejecting the request —
/// used by read endpoints that decorate results differently for
/// authenticated viewers without requiring authentication.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = XrpcError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(jwt_secret) = Extension::<JwtSecret>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                XrpcError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "jwt secret not configured",
                )
            })?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                XrpcError::new(
                    StatusCode::UNAUTHORIZED,
                    "AuthenticationRequired",
                    "missing authorization header",
                )
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            XrpcError::new(
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                "invalid authorization format",
            )
        })?;

        let claims = covesview_crypto::validate_session_token(token, &jwt_secret.0).map_err(|e| {
            let message = e.to_string();
            if message.contains("ExpiredSignature") {
                XrpcError::new(StatusCode::UNAUTHORIZED, "ExpiredToken", "token has expired")
            } else {
                XrpcError::new(StatusCode::UNAUTHORIZED, "InvalidToken", "invalid token")
            }
        })?;

        Ok(AuthenticatedUser {
            did: claims.sub,
            session_id: claims.session_id,
        })
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = XrpcError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let has_auth = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some();

        if !has_auth {
            return Ok(OptionalAuth(None));
        }

        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalAuth(Some(user))),
            Err(e) => Err(e),
        }
    }
}
