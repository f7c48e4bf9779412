//! Syntactic CID validation for the `<cid>` path segment. This never touches
//! the network — it only rejects malformed input before any fetch is made.

pub fn is_valid_cid(raw: &str) -> bool {
    raw.parse::<ipld_core::cid::Cid>().is_ok()
}
