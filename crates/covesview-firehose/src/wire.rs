use std::io::Cursor;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("cbor decode error: {0}")]
    CborDecode(String),
    #[error("car parse error: {0}")]
    CarParse(String),
}

/// Frame header preceding every firehose message body.
/// `op` is 1 for a message frame or -1 for an error frame; `t` names the
/// event type tag (e.g. `#commit`) and is absent on error frames.
#[derive(Debug, Deserialize)]
pub struct FrameHeader {
    pub op: i32,
    pub t: Option<String>,
}

/// Decode the frame header from the start of a firehose message and return
/// it along with the byte offset where the event body begins.
pub fn decode_frame_header(data: &[u8]) -> Result<(FrameHeader, usize), WireError> {
    let mut cursor = Cursor::new(data);
    let header: FrameHeader = ciborium::from_reader(&mut cursor)
        .map_err(|e| WireError::CborDecode(format!("failed to decode frame header: {e}")))?;
    let offset = cursor.position() as usize;
    Ok((header, offset))
}

#[derive(Debug, Deserialize)]
pub struct RepoOp {
    pub action: String,
    pub path: String,
    pub cid: Option<ipld_core::cid::Cid>,
}

#[derive(Debug, Deserialize)]
pub struct CommitEvent {
    pub seq: i64,
    #[serde(default)]
    pub rebase: bool,
    #[serde(rename = "tooBig", default)]
    pub too_big: bool,
    pub repo: String,
    pub commit: ipld_core::cid::Cid,
    pub rev: String,
    pub since: Option<String>,
    #[serde(with = "serde_bytes", default)]
    pub blocks: Option<Vec<u8>>,
    pub ops: Vec<RepoOp>,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    pub seq: i64,
    pub did: String,
    pub time: String,
    pub handle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountEvent {
    pub seq: i64,
    pub did: String,
    pub time: String,
    pub active: bool,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InfoEvent {
    pub name: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FirehoseErrorFrame {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Split a commit op path into `(collection, rkey)`. Malformed paths (empty
/// collection or rkey) are rejected rather than silently truncated.
pub fn parse_record_path(path: &str) -> Option<(&str, &str)> {
    let mut parts = path.splitn(2, '/');
    let collection = parts.next().filter(|s| !s.is_empty())?;
    let rkey = parts.next().filter(|s| !s.is_empty())?;
    Some((collection, rkey))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn make_frame<T: Serialize>(op: i32, t: Option<&str>, payload: &T) -> Vec<u8> {
        #[derive(Serialize)]
        struct Header<'a> {
            op: i32,
            #[serde(skip_serializing_if = "Option::is_none")]
            t: Option<&'a str>,
        }
        let mut data = serde_ipld_dagcbor::to_vec(&Header { op, t }).unwrap();
        data.extend(serde_ipld_dagcbor::to_vec(payload).unwrap());
        data
    }

    #[test]
    fn decode_header_commit() {
        #[derive(Serialize, Deserialize)]
        struct Dummy {
            seq: i64,
        }
        let frame = make_frame(1, Some("#commit"), &Dummy { seq: 42 });
        let (header, offset) = decode_frame_header(&frame).unwrap();
        assert_eq!(header.op, 1);
        assert_eq!(header.t.as_deref(), Some("#commit"));
        let payload: Dummy = serde_ipld_dagcbor::from_slice(&frame[offset..]).unwrap();
        assert_eq!(payload.seq, 42);
    }

    #[test]
    fn decode_header_error_frame() {
        #[derive(Serialize)]
        struct ErrPayload {
            error: String,
        }
        let frame = make_frame(
            -1,
            None,
            &ErrPayload {
                error: "FutureCursor".to_string(),
            },
        );
        let (header, _) = decode_frame_header(&frame).unwrap();
        assert_eq!(header.op, -1);
        assert_eq!(header.t, None);
    }

    #[test]
    fn decode_header_rejects_garbage() {
        let garbage = vec![0xff, 0xff, 0xff];
        assert!(decode_frame_header(&garbage).is_err());
    }

    #[test]
    fn parse_record_path_valid() {
        assert_eq!(
            parse_record_path("app.coves.post/3abc123"),
            Some(("app.coves.post", "3abc123"))
        );
    }

    #[test]
    fn parse_record_path_rejects_empty_parts() {
        assert_eq!(parse_record_path("/3abc123"), None);
        assert_eq!(parse_record_path("app.coves.post/"), None);
        assert_eq!(parse_record_path(""), None);
    }

    #[test]
    fn parse_record_path_keeps_only_first_two_segments() {
        assert_eq!(
            parse_record_path("collection/rkey/extra"),
            Some(("collection", "rkey"))
        );
    }
}
