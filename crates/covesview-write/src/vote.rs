use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use covesview_core::collections::VOTE;
use covesview_core::error::AppResult;
use covesview_core::traits::DataServerClient;
use covesview_core::types::{Direction, StrongRef};
use covesview_crypto::TidGenerator;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct CachedVote {
    pub direction: Direction,
    pub uri: String,
}

/// Per-session cache of a viewer's votes, so repeated toggles within one
/// session don't need a store round trip to find the existing vote. Callers
/// may pre-populate it from a batch lookup when a feed loads.
#[derive(Default)]
pub struct VoteCache {
    entries: RwLock<HashMap<(String, String), CachedVote>>,
}

impl VoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, voter_did: &str, subject_uri: &str) -> Option<CachedVote> {
        self.entries
            .read()
            .expect("vote cache lock poisoned")
            .get(&(voter_did.to_string(), subject_uri.to_string()))
            .cloned()
    }

    pub fn put(&self, voter_did: &str, subject_uri: &str, vote: CachedVote) {
        self.entries
            .write()
            .expect("vote cache lock poisoned")
            .insert((voter_did.to_string(), subject_uri.to_string()), vote);
    }

    pub fn remove(&self, voter_did: &str, subject_uri: &str) {
        self.entries
            .write()
            .expect("vote cache lock poisoned")
            .remove(&(voter_did.to_string(), subject_uri.to_string()));
    }
}

/// The three outcomes of requesting a vote toggle, per spec 4.6's table:
/// no prior vote creates one, a repeat of the same direction removes it, and
/// a flip replaces the old vote record with a new one under a fresh rkey.
#[derive(Debug, PartialEq, Eq)]
pub enum VoteAction {
    Create,
    ToggleOff { existing_uri: String },
    Replace { old_uri: String },
}

pub fn decide_vote_action(existing: Option<&CachedVote>, requested: Direction) -> VoteAction {
    match existing {
        None => VoteAction::Create,
        Some(v) if v.direction == requested => VoteAction::ToggleOff {
            existing_uri: v.uri.clone(),
        },
        Some(v) => VoteAction::Replace {
            old_uri: v.uri.clone(),
        },
    }
}

/// Apply a vote toggle request for `voter_did` against `subject`, returning
/// the new vote's strong ref, or `None` if the toggle removed an existing
/// vote with no replacement.
pub async fn toggle_vote(
    dataserver: &dyn DataServerClient,
    tid: &TidGenerator,
    cache: &VoteCache,
    voter_did: &str,
    data_server: &str,
    access_token: &str,
    subject: &StrongRef,
    requested: Direction,
) -> AppResult<Option<StrongRef>> {
    let existing = cache.get(voter_did, &subject.uri);
    match decide_vote_action(existing.as_ref(), requested) {
        VoteAction::Create => {
            let result = create_vote(
                dataserver,
                tid,
                voter_did,
                data_server,
                access_token,
                subject,
                requested,
            )
            .await?;
            cache.put(
                voter_did,
                &subject.uri,
                CachedVote {
                    direction: requested,
                    uri: result.uri.clone(),
                },
            );
            Ok(Some(result))
        }
        VoteAction::ToggleOff { existing_uri } => {
            delete_vote_record(dataserver, voter_did, data_server, access_token, &existing_uri).await?;
            cache.remove(voter_did, &subject.uri);
            Ok(None)
        }
        VoteAction::Replace { old_uri } => {
            delete_vote_record(dataserver, voter_did, data_server, access_token, &old_uri).await?;
            let result = create_vote(
                dataserver,
                tid,
                voter_did,
                data_server,
                access_token,
                subject,
                requested,
            )
            .await?;
            cache.put(
                voter_did,
                &subject.uri,
                CachedVote {
                    direction: requested,
                    uri: result.uri.clone(),
                },
            );
            Ok(Some(result))
        }
    }
}

/// Explicit removal, independent of the toggle endpoint.
pub async fn remove_vote(
    dataserver: &dyn DataServerClient,
    cache: &VoteCache,
    voter_did: &str,
    data_server: &str,
    access_token: &str,
    subject_uri: &str,
) -> AppResult<()> {
    if let Some(existing) = cache.get(voter_did, subject_uri) {
        delete_vote_record(dataserver, voter_did, data_server, access_token, &existing.uri).await?;
        cache.remove(voter_did, subject_uri);
    }
    Ok(())
}

async fn create_vote(
    dataserver: &dyn DataServerClient,
    tid: &TidGenerator,
    voter_did: &str,
    data_server: &str,
    access_token: &str,
    subject: &StrongRef,
    direction: Direction,
) -> AppResult<StrongRef> {
    let rkey = tid.next_tid();
    let record = json!({
        "$type": VOTE,
        "subject": { "uri": subject.uri, "cid": subject.cid },
        "direction": direction.as_str(),
        "createdAt": Utc::now().to_rfc3339(),
    });
    dataserver
        .put_record(data_server, access_token, voter_did, VOTE, &rkey, record, None)
        .await
}

fn record_rkey(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

async fn delete_vote_record(
    dataserver: &dyn DataServerClient,
    voter_did: &str,
    data_server: &str,
    access_token: &str,
    uri: &str,
) -> AppResult<()> {
    dataserver
        .delete_record(data_server, access_token, voter_did, VOTE, record_rkey(uri))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_existing_vote_creates() {
        assert_eq!(decide_vote_action(None, Direction::Up), VoteAction::Create);
    }

    #[test]
    fn same_direction_toggles_off() {
        let existing = CachedVote {
            direction: Direction::Up,
            uri: "at://did:example/app.coves.vote/abc".to_string(),
        };
        assert_eq!(
            decide_vote_action(Some(&existing), Direction::Up),
            VoteAction::ToggleOff {
                existing_uri: existing.uri.clone()
            }
        );
    }

    #[test]
    fn opposite_direction_replaces() {
        let existing = CachedVote {
            direction: Direction::Down,
            uri: "at://did:example/app.coves.vote/abc".to_string(),
        };
        assert_eq!(
            decide_vote_action(Some(&existing), Direction::Up),
            VoteAction::Replace {
                old_uri: existing.uri.clone()
            }
        );
    }

    #[test]
    fn cache_roundtrip() {
        let cache = VoteCache::new();
        assert!(cache.get("did:a", "at://x").is_none());
        cache.put(
            "did:a",
            "at://x",
            CachedVote {
                direction: Direction::Up,
                uri: "at://did:a/app.coves.vote/1".to_string(),
            },
        );
        assert_eq!(cache.get("did:a", "at://x").unwrap().direction, Direction::Up);
        cache.remove("did:a", "at://x");
        assert!(cache.get("did:a", "at://x").is_none());
    }
}
