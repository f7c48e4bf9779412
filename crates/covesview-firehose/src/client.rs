use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use covesview_core::error::AppError;
use covesview_core::traits::{RecordStore, SessionStore};
use covesview_identity::IdentityResolver;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

use crate::car::parse_commit_blocks;
use crate::consumers;
use crate::wire::{
    self, AccountEvent, CommitEvent, FirehoseErrorFrame, IdentityEvent, InfoEvent,
    decode_frame_header, parse_record_path,
};

/// Subscribes to a relay's `com.atproto.sync.subscribeRepos` stream and
/// applies every commit touching an indexed collection to the record store.
/// Unlike a single-actor firehose client, this one never filters by DID: the
/// whole network's commits are candidates, and only the collection name
/// decides whether an op is indexed.
pub struct FirehoseClient {
    relay_url: String,
    backoff_cap: Duration,
    store: Arc<dyn RecordStore>,
    identity: Arc<IdentityResolver>,
    sessions: Arc<dyn SessionStore>,
}

impl FirehoseClient {
    pub fn new(
        relay_url: impl Into<String>,
        backoff_cap: Duration,
        store: Arc<dyn RecordStore>,
        identity: Arc<IdentityResolver>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            relay_url: relay_url.into(),
            backoff_cap,
            store,
            identity,
            sessions,
        }
    }

    /// Run the reconnect loop until `shutdown_rx` reports shutdown. Backoff
    /// doubles on each consecutive failure, capped, and resets once a
    /// connection is established.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = Duration::from_secs(1);

        loop {
            if *shutdown_rx.borrow() {
                info!("firehose client shutting down");
                return;
            }

            match self.connect_and_process(&mut shutdown_rx).await {
                Ok(()) => return,
                Err(e) => {
                    error!(error = %e, "firehose connection error, reconnecting");
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = std::cmp::min(backoff * 2, self.backoff_cap);
                }
            }
        }
    }

    async fn connect_and_process(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/xrpc/com.atproto.sync.subscribeRepos",
            self.relay_url.trim_end_matches('/')
        );
        info!(url = %url, "connecting to firehose");

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|e| AppError::Upstream(format!("firehose connection failed: {e}")))?;
        let (_write, mut read) = ws_stream.split();
        info!("firehose connected");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("firehose received shutdown signal");
                        return Ok(());
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            if let Err(e) = self.handle_message(&data).await {
                                warn!(error = %e, "failed to handle firehose message");
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(AppError::Upstream("firehose connection closed by server".into()));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(AppError::Upstream(format!("firehose read error: {e}")));
                        }
                        None => {
                            return Err(AppError::Upstream("firehose stream ended".into()));
                        }
                    }
                }
            }
        }
    }

    async fn handle_message(&self, data: &[u8]) -> Result<(), AppError> {
        let (header, offset) =
            decode_frame_header(data).map_err(|e| AppError::Upstream(e.to_string()))?;

        if header.op != 1 {
            if header.op == -1 {
                let payload = &data[offset..];
                match serde_ipld_dagcbor::from_slice::<FirehoseErrorFrame>(payload) {
                    Ok(err) => error!(error = ?err.error, message = ?err.message, "firehose error frame"),
                    Err(_) => error!("firehose error frame received (undecodable)"),
                }
            }
            return Ok(());
        }

        let payload = &data[offset..];
        match header.t.as_deref() {
            Some("#commit") => {
                let commit: CommitEvent = serde_ipld_dagcbor::from_slice(payload)
                    .map_err(|e| AppError::Upstream(format!("bad commit event: {e}")))?;
                self.handle_commit(commit).await
            }
            Some("#identity") => {
                let ev: IdentityEvent = serde_ipld_dagcbor::from_slice(payload)
                    .map_err(|e| AppError::Upstream(format!("bad identity event: {e}")))?;
                if let Some(handle) = ev.handle {
                    self.store.update_handle(&ev.did, &handle).await?;
                    self.sessions.update_handle_for_sessions(&ev.did, &handle).await?;
                }
                self.identity.invalidate(&ev.did).await?;
                Ok(())
            }
            Some("#account") => {
                let ev: AccountEvent = serde_ipld_dagcbor::from_slice(payload)
                    .map_err(|e| AppError::Upstream(format!("bad account event: {e}")))?;
                trace!(did = %ev.did, active = ev.active, "account status update");
                Ok(())
            }
            Some("#info") => {
                let info: InfoEvent = serde_ipld_dagcbor::from_slice(payload)
                    .map_err(|e| AppError::Upstream(format!("bad info event: {e}")))?;
                debug!(name = ?info.name, message = ?info.message, "firehose info frame");
                Ok(())
            }
            Some(t) => {
                trace!(message_type = %t, "ignoring unhandled firehose event type");
                Ok(())
            }
            None => {
                trace!("ignoring firehose frame with no type");
                Ok(())
            }
        }
    }

    async fn handle_commit(&self, commit: CommitEvent) -> Result<(), AppError> {
        let blocks = if let Some(ref data) = commit.blocks {
            parse_commit_blocks(data)
                .await
                .map_err(|e| AppError::Upstream(e.to_string()))?
        } else {
            HashMap::new()
        };

        for op in &commit.ops {
            let Some((collection, rkey)) = parse_record_path(&op.path) else {
                warn!(path = %op.path, "malformed record path, skipping");
                continue;
            };
            if !covesview_core::collections::ALL.contains(&collection) {
                continue;
            }

            if let Err(e) = self
                .apply_op(&commit.repo, collection, rkey, op, &blocks)
                .await
            {
                warn!(
                    repo = %commit.repo, collection, rkey, error = %e,
                    "failed to apply firehose op"
                );
            }
        }
        Ok(())
    }

    async fn apply_op(
        &self,
        repo: &str,
        collection: &str,
        rkey: &str,
        op: &wire::RepoOp,
        blocks: &HashMap<String, Vec<u8>>,
    ) -> Result<(), AppError> {
        use covesview_core::collections as c;

        match op.action.as_str() {
            "create" | "update" => {
                let Some(cid) = &op.cid else {
                    return Ok(());
                };
                let cid_str = cid.to_string();
                let Some(bytes) = blocks.get(&cid_str) else {
                    warn!(repo, collection, rkey, "op references a block not present in commit car");
                    return Ok(());
                };

                match collection {
                    c::COMMUNITY_DECLARATION => {
                        consumers::apply_community_put(
                            self.store.as_ref(),
                            &self.identity,
                            repo,
                            rkey,
                            &cid_str,
                            bytes,
                        )
                        .await
                    }
                    c::POST => {
                        consumers::apply_post_put(
                            self.store.as_ref(),
                            &self.identity,
                            repo,
                            rkey,
                            &cid_str,
                            bytes,
                        )
                        .await
                    }
                    c::COMMENT => {
                        consumers::apply_comment_put(
                            self.store.as_ref(),
                            &self.identity,
                            repo,
                            rkey,
                            &cid_str,
                            bytes,
                        )
                        .await
                    }
                    c::VOTE => {
                        consumers::apply_vote_put(self.store.as_ref(), &self.identity, repo, rkey, bytes)
                            .await
                    }
                    c::SUBSCRIPTION => {
                        consumers::apply_subscription_put(self.store.as_ref(), &self.identity, repo, bytes)
                            .await
                    }
                    c::AGGREGATOR_DECLARATION => {
                        consumers::apply_aggregator_put(
                            self.store.as_ref(),
                            &self.identity,
                            repo,
                            rkey,
                            bytes,
                        )
                        .await
                    }
                    c::AGGREGATOR_AUTHORIZATION => {
                        consumers::apply_aggregator_authorization_put(
                            self.store.as_ref(),
                            &self.identity,
                            repo,
                            rkey,
                            bytes,
                        )
                        .await
                    }
                    _ => Ok(()),
                }
            }
            "delete" => match collection {
                c::COMMUNITY_DECLARATION => consumers::apply_community_delete(self.store.as_ref(), repo).await,
                c::POST => consumers::apply_post_delete(self.store.as_ref(), repo, rkey).await,
                c::COMMENT => consumers::apply_comment_delete(self.store.as_ref(), repo, rkey).await,
                c::VOTE => consumers::apply_vote_delete(self.store.as_ref(), repo, rkey).await,
                c::SUBSCRIPTION => {
                    consumers::apply_subscription_delete(self.store.as_ref(), repo, rkey).await
                }
                c::AGGREGATOR_AUTHORIZATION => {
                    consumers::apply_aggregator_authorization_delete(self.store.as_ref(), repo, rkey).await
                }
                _ => Ok(()),
            },
            other => {
                trace!(action = other, "unknown repo op action");
                Ok(())
            }
        }
    }
}
