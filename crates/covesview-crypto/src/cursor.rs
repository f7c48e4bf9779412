use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("malformed cursor")]
    Malformed,
    #[error("cursor signature mismatch")]
    BadSignature,
}

const SEP: u8 = 0;

/// Encode an opaque, tamper-evident pagination cursor from a sort value and
/// a tiebreaker URI. The cursor carries an HMAC tag over its own payload so
/// a client can't construct one that skips or repeats rows by hand.
pub fn encode_cursor(secret: &[u8], sort_value: &str, tiebreaker_uri: &str) -> String {
    let mut payload = Vec::with_capacity(sort_value.len() + tiebreaker_uri.len() + 1);
    payload.extend_from_slice(sort_value.as_bytes());
    payload.push(SEP);
    payload.extend_from_slice(tiebreaker_uri.as_bytes());

    let tag = sign(secret, &payload);

    let mut out = payload;
    out.push(SEP);
    out.extend_from_slice(&tag);
    URL_SAFE_NO_PAD.encode(out)
}

/// Decode and verify a cursor produced by [`encode_cursor`], returning
/// `(sort_value, tiebreaker_uri)`.
pub fn decode_cursor(secret: &[u8], cursor: &str) -> Result<(String, String), CursorError> {
    let raw = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::Malformed)?;

    if raw.len() < 32 + 1 {
        return Err(CursorError::Malformed);
    }
    let tag_start = raw.len() - 32;
    let tag = &raw[tag_start..];
    let sep_index = tag_start - 1;
    if raw.get(sep_index) != Some(&SEP) {
        return Err(CursorError::Malformed);
    }
    let body = &raw[..sep_index];

    let expected = sign(secret, body);
    if expected.as_slice() != tag {
        return Err(CursorError::BadSignature);
    }

    let mid = body
        .iter()
        .position(|b| *b == SEP)
        .ok_or(CursorError::Malformed)?;
    let sort_value = String::from_utf8(body[..mid].to_vec()).map_err(|_| CursorError::Malformed)?;
    let tiebreaker_uri =
        String::from_utf8(body[mid + 1..].to_vec()).map_err(|_| CursorError::Malformed)?;

    Ok((sort_value, tiebreaker_uri))
}

fn sign(secret: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let secret = b"cursor-secret";
        let cursor = encode_cursor(secret, "1000", "at://did:plc:abc/app.coves.post/xyz");
        let (sort_value, tiebreaker) = decode_cursor(secret, &cursor).unwrap();
        assert_eq!(sort_value, "1000");
        assert_eq!(tiebreaker, "at://did:plc:abc/app.coves.post/xyz");
    }

    #[test]
    fn tampered_cursor_rejected() {
        let secret = b"cursor-secret";
        let mut cursor = encode_cursor(secret, "1000", "at://did:plc:abc/app.coves.post/xyz");
        cursor.push('a');
        assert!(decode_cursor(secret, &cursor).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let cursor = encode_cursor(b"secret-a", "5", "at://did:plc:a/c/1");
        let result = decode_cursor(b"secret-b", &cursor);
        assert!(matches!(result, Err(CursorError::BadSignature)));
    }

    #[test]
    fn garbage_input_rejected() {
        assert!(decode_cursor(b"secret", "not-valid-base64!!!").is_err());
    }
}
