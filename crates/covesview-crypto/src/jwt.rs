use covesview_core::{AppError, AppResult};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims for the short-lived session token that authenticates requests to
/// this AppView's own RPC surface. Distinct from the OAuth access token an
/// actor's own authorization server issues, which is stored opaquely and
/// never parsed here.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub session_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Create a session token valid for `ttl_secs`, signed with HS256.
pub fn create_session_token(
    did: &str,
    session_id: &str,
    secret: &str,
    ttl_secs: i64,
) -> AppResult<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: did.to_string(),
        session_id: session_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Authentication(e.to_string()))
}

pub fn validate_session_token(token: &str, secret: &str) -> AppResult<SessionClaims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();
    let token_data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| AppError::Authentication(e.to_string()))?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-tests";
    const OTHER_SECRET: &str = "different-secret-key-for-jwt";
    const DID: &str = "did:plc:testuser123";

    #[test]
    fn session_token_roundtrip() {
        let token = create_session_token(DID, "sess-1", SECRET, 3600).unwrap();
        let claims = validate_session_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, DID);
        assert_eq!(claims.session_id, "sess-1");
    }

    #[test]
    fn session_token_wrong_secret_fails() {
        let token = create_session_token(DID, "sess-1", SECRET, 3600).unwrap();
        let result = validate_session_token(&token, OTHER_SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn expired_session_token_fails() {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: DID.to_string(),
            session_id: "sess-2".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let key = EncodingKey::from_secret(SECRET.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = validate_session_token(&token, SECRET);
        assert!(result.is_err(), "expired token should fail validation");
    }
}
