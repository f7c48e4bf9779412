use std::collections::HashMap;
use std::io::Cursor;

use iroh_car::CarReader;

use crate::wire::WireError;

/// Read every block out of a commit's CAR-encoded byte slice, keyed by its
/// string CID. The firehose sends the full set of blocks touched by a
/// commit, not just the ones named in its ops, so this is a flat lookup
/// table rather than a traversal of the repo tree.
pub async fn parse_commit_blocks(data: &[u8]) -> Result<HashMap<String, Vec<u8>>, WireError> {
    let cursor = Cursor::new(data);
    let mut reader = CarReader::new(cursor)
        .await
        .map_err(|e| WireError::CarParse(format!("failed to read commit car: {e}")))?;

    let mut blocks = HashMap::new();
    loop {
        match reader.next_block().await {
            Ok(Some((cid, bytes))) => {
                blocks.insert(cid.to_string(), bytes);
            }
            Ok(None) => break,
            Err(e) => return Err(WireError::CarParse(format!("failed to read block: {e}"))),
        }
    }
    Ok(blocks)
}
