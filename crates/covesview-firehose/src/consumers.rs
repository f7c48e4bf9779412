//! Per-collection handlers that turn a decoded commit op into `RecordStore`
//! mutations. Every handler is written to be safe to replay: applying the
//! same op twice must leave the store in the state a single application
//! would have produced.

use chrono::{DateTime, Utc};
use covesview_core::error::AppResult;
use covesview_core::traits::RecordStore;
use covesview_core::types::{
    Aggregator, AggregatorAuthorization, Comment, Community, Direction, Post, Subscription, User,
    Visibility,
};
use covesview_identity::IdentityResolver;
use tracing::warn;

use crate::records::{
    AggregatorAuthorizationWire, AggregatorDeclarationWire, CommentRecordWire,
    CommunityDeclarationWire, PostRecordWire, SubscriptionRecordWire, VoteRecordWire,
};

fn parse_created_at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn record_uri(repo: &str, collection: &str, rkey: &str) -> String {
    format!("at://{repo}/{collection}/{rkey}")
}

/// Make sure a `users` row exists for a DID seen while indexing a record,
/// resolving its handle and data server the first time it's observed.
pub async fn ensure_user(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    did: &str,
) -> AppResult<()> {
    if store.get_user_by_did(did).await?.is_some() {
        return Ok(());
    }
    let identity = identity.resolve_did(did).await?;
    let now = Utc::now();
    store
        .upsert_user(&User {
            did: identity.did,
            handle: identity.handle,
            data_server: identity.data_server,
            created_at: now,
            updated_at: now,
        })
        .await
}

pub async fn apply_community_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    cid: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: CommunityDeclarationWire = serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| covesview_core::error::AppError::Validation(format!("bad community record: {e}")))?;

    ensure_user(store, identity, repo).await?;
    let resolved = identity.resolve_did(repo).await?;

    let existing = store.get_community_by_did(repo).await?;
    let now = Utc::now();
    let (subscriber_count, member_count, created_at) = match &existing {
        Some(c) => (c.subscriber_count, c.member_count, c.created_at),
        None => (0, 0, parse_created_at(&wire.created_at)),
    };

    store
        .upsert_community(&Community {
            did: repo.to_string(),
            handle: resolved.handle,
            name: wire.name,
            display_name: wire.display_name,
            description: wire.description,
            owner_did: repo.to_string(),
            created_by_did: repo.to_string(),
            hosted_by_did: resolved.data_server.clone(),
            visibility: wire
                .visibility
                .as_deref()
                .map(Visibility::parse)
                .unwrap_or(Visibility::Public),
            moderation_type: wire.moderation_type.unwrap_or_else(|| "open".to_string()),
            external_discovery: wire.external_discovery.unwrap_or(true),
            record_uri: record_uri(repo, covesview_core::collections::COMMUNITY_DECLARATION, rkey),
            record_cid: cid.to_string(),
            avatar_cid: wire.avatar.map(|b| b.cid.to_string()),
            banner_cid: wire.banner.map(|b| b.cid.to_string()),
            subscriber_count,
            member_count,
            data_server: resolved.data_server,
            created_at,
            updated_at: now,
        })
        .await
}

pub async fn apply_community_delete(store: &dyn RecordStore, repo: &str) -> AppResult<()> {
    store.delete_community(repo).await
}

pub async fn apply_post_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    cid: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: PostRecordWire = serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| covesview_core::error::AppError::Validation(format!("bad post record: {e}")))?;

    ensure_user(store, identity, repo).await?;

    let uri = record_uri(repo, covesview_core::collections::POST, rkey);
    let existing = store.get_post_by_uri(&uri).await?;
    let now = Utc::now();
    let is_new = existing.is_none();
    let (upvote_count, downvote_count, comment_count, score, created_at) = match &existing {
        Some(p) => (
            p.upvote_count,
            p.downvote_count,
            p.comment_count,
            p.score,
            p.created_at,
        ),
        None => (0, 0, 0, 0, parse_created_at(&wire.created_at)),
    };
    let community_did = wire.community;
    let aggregator_did = wire.aggregator;

    store
        .upsert_post(&Post {
            uri: uri.clone(),
            cid: cid.to_string(),
            rkey: rkey.to_string(),
            author_did: repo.to_string(),
            community_did: community_did.clone(),
            title: wire.title,
            content: wire.content,
            embed: wire.embed.as_ref().map(|e| e.to_json()),
            upvote_count,
            downvote_count,
            comment_count,
            score,
            created_at,
            updated_at: now,
            indexed_at: now,
        })
        .await?;

    // Posts authored on a community's behalf by an aggregator carry the
    // aggregator's DID so statistics can be attributed on first indexing.
    // A write service may have already recorded this post synchronously for
    // rate-limit accounting; `record_aggregator_post` is idempotent, so the
    // count is only bumped once either way.
    if is_new {
        if let Some(aggregator_did) = aggregator_did {
            let newly_recorded = store
                .record_aggregator_post(&covesview_core::types::AggregatorPostTracking {
                    aggregator_did: aggregator_did.clone(),
                    community_did,
                    post_uri: uri,
                    posted_at: now,
                })
                .await?;
            if newly_recorded {
                store.adjust_aggregator_counts(&aggregator_did, 0, 1).await?;
            }
        }
    }
    Ok(())
}

pub async fn apply_post_delete(store: &dyn RecordStore, repo: &str, rkey: &str) -> AppResult<()> {
    let uri = record_uri(repo, covesview_core::collections::POST, rkey);
    store.delete_post(&uri).await
}

pub async fn apply_comment_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    cid: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: CommentRecordWire = serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| covesview_core::error::AppError::Validation(format!("bad comment record: {e}")))?;

    ensure_user(store, identity, repo).await?;

    let uri = record_uri(repo, covesview_core::collections::COMMENT, rkey);
    let existing = store.get_comment_by_uri(&uri).await?;
    let now = Utc::now();
    let (upvote_count, downvote_count, reply_count, score, deleted, created_at) = match &existing {
        Some(c) => (
            c.upvote_count,
            c.downvote_count,
            c.reply_count,
            c.score,
            c.deleted,
            c.created_at,
        ),
        None => (0, 0, 0, 0, false, parse_created_at(&wire.created_at)),
    };

    let parent = wire.parent.unwrap_or(crate::records::StrongRefWire {
        uri: wire.root.uri.clone(),
        cid: wire.root.cid.clone(),
    });

    store
        .upsert_comment(&Comment {
            uri,
            cid: cid.to_string(),
            commenter_did: repo.to_string(),
            root_uri: wire.root.uri,
            root_cid: wire.root.cid,
            parent_uri: parent.uri,
            parent_cid: parent.cid,
            content: wire.content,
            embed: wire.embed.as_ref().map(|e| e.to_json()),
            upvote_count,
            downvote_count,
            reply_count,
            score,
            deleted,
            created_at,
            updated_at: now,
        })
        .await
}

pub async fn apply_comment_delete(
    store: &dyn RecordStore,
    repo: &str,
    rkey: &str,
) -> AppResult<()> {
    let uri = record_uri(repo, covesview_core::collections::COMMENT, rkey);
    store.mark_comment_deleted(&uri).await
}

/// Adjust the vote count on whichever kind of subject a vote targets. A
/// subject is looked up as a post first, then as a comment, since the two
/// id spaces never overlap.
async fn adjust_subject_vote_count(
    store: &dyn RecordStore,
    subject_uri: &str,
    direction: Direction,
    delta: i64,
) -> AppResult<()> {
    if store.get_post_by_uri(subject_uri).await?.is_some() {
        store
            .adjust_post_vote_count(subject_uri, direction, delta)
            .await
    } else if store.get_comment_by_uri(subject_uri).await?.is_some() {
        store
            .adjust_comment_vote_count(subject_uri, direction, delta)
            .await
    } else {
        warn!(subject = %subject_uri, "vote targets unknown subject, skipping count adjustment");
        Ok(())
    }
}

pub async fn apply_vote_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: VoteRecordWire = serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| covesview_core::error::AppError::Validation(format!("bad vote record: {e}")))?;
    let direction = covesview_core::types::Direction::parse(&wire.direction)
        .ok_or_else(|| covesview_core::error::AppError::Validation("bad vote direction".to_string()))?;

    ensure_user(store, identity, repo).await?;

    let uri = record_uri(repo, covesview_core::collections::VOTE, rkey);
    if let Some(prior) = store.get_vote(repo, &wire.subject.uri).await? {
        if prior.direction == direction && prior.uri == uri {
            return Ok(());
        }
        adjust_subject_vote_count(store, &prior.subject_uri, prior.direction, -1).await?;
    }

    store
        .upsert_vote(&covesview_core::types::Vote {
            uri,
            voter_did: repo.to_string(),
            subject_uri: wire.subject.uri.clone(),
            subject_cid: wire.subject.cid,
            direction,
            created_at: parse_created_at(&wire.created_at),
        })
        .await?;
    adjust_subject_vote_count(store, &wire.subject.uri, direction, 1).await
}

pub async fn apply_vote_delete(store: &dyn RecordStore, repo: &str, rkey: &str) -> AppResult<()> {
    let uri = record_uri(repo, covesview_core::collections::VOTE, rkey);
    if let Some(vote) = store.get_vote_by_uri(&uri).await? {
        adjust_subject_vote_count(store, &vote.subject_uri, vote.direction, -1).await?;
        store.delete_vote(repo, &vote.subject_uri).await?;
    }
    Ok(())
}

pub async fn apply_subscription_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: SubscriptionRecordWire = serde_ipld_dagcbor::from_slice(bytes).map_err(|e| {
        covesview_core::error::AppError::Validation(format!("bad subscription record: {e}"))
    })?;

    ensure_user(store, identity, repo).await?;

    let existing = store.get_subscription(repo, &wire.community).await?;
    store
        .upsert_subscription(&Subscription {
            user_did: repo.to_string(),
            community_did: wire.community.clone(),
            content_visibility: wire.content_visibility.unwrap_or(0) as i32,
            record_uri: record_uri(
                repo,
                covesview_core::collections::SUBSCRIPTION,
                &wire.community,
            ),
            created_at: parse_created_at(&wire.created_at),
        })
        .await?;

    if existing.is_none() {
        store
            .adjust_community_subscriber_count(&wire.community, 1)
            .await?;
    }
    Ok(())
}

pub async fn apply_subscription_delete(
    store: &dyn RecordStore,
    repo: &str,
    community_did: &str,
) -> AppResult<()> {
    if store.get_subscription(repo, community_did).await?.is_some() {
        store.delete_subscription(repo, community_did).await?;
        store
            .adjust_community_subscriber_count(community_did, -1)
            .await?;
    }
    Ok(())
}

pub async fn apply_aggregator_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: AggregatorDeclarationWire = serde_ipld_dagcbor::from_slice(bytes).map_err(|e| {
        covesview_core::error::AppError::Validation(format!("bad aggregator record: {e}"))
    })?;

    ensure_user(store, identity, repo).await?;

    let existing = store.get_aggregator_by_did(repo).await?;
    let now = Utc::now();
    let (communities_using, posts_created, created_at) = match &existing {
        Some(a) => (a.communities_using, a.posts_created, a.created_at),
        None => (0, 0, parse_created_at(&wire.created_at)),
    };

    store
        .upsert_aggregator(&Aggregator {
            did: repo.to_string(),
            display_name: wire.display_name,
            description: wire.description,
            maintainer_did: Some(repo.to_string()),
            source_url: wire.source_url,
            config_schema: wire.config_schema,
            record_uri: Some(record_uri(
                repo,
                covesview_core::collections::AGGREGATOR_DECLARATION,
                rkey,
            )),
            communities_using,
            posts_created,
            created_at,
            updated_at: now,
        })
        .await
}

/// Ensure an aggregator row exists before an authorization referencing it is
/// indexed, so the authorization never points at a DID with no row of its
/// own. The placeholder is superseded the moment the aggregator's own
/// declaration record is indexed, since that upsert keeps this row's counts.
async fn ensure_aggregator_placeholder(store: &dyn RecordStore, aggregator_did: &str) -> AppResult<()> {
    if store.get_aggregator_by_did(aggregator_did).await?.is_some() {
        return Ok(());
    }
    let now = Utc::now();
    store
        .upsert_aggregator(&Aggregator {
            did: aggregator_did.to_string(),
            display_name: None,
            description: None,
            maintainer_did: None,
            source_url: None,
            config_schema: None,
            record_uri: None,
            communities_using: 0,
            posts_created: 0,
            created_at: now,
            updated_at: now,
        })
        .await
}

pub async fn apply_aggregator_authorization_put(
    store: &dyn RecordStore,
    identity: &IdentityResolver,
    repo: &str,
    rkey: &str,
    bytes: &[u8],
) -> AppResult<()> {
    let wire: AggregatorAuthorizationWire = serde_ipld_dagcbor::from_slice(bytes).map_err(|e| {
        covesview_core::error::AppError::Validation(format!("bad authorization record: {e}"))
    })?;

    ensure_user(store, identity, repo).await?;
    ensure_aggregator_placeholder(store, &wire.aggregator).await?;

    let existing = store
        .get_aggregator_authorization(&wire.aggregator, repo)
        .await?;
    let was_enabled = existing.as_ref().map(|a| a.enabled).unwrap_or(false);
    let now = Utc::now();

    store
        .upsert_aggregator_authorization(&AggregatorAuthorization {
            aggregator_did: wire.aggregator.clone(),
            community_did: repo.to_string(),
            enabled: wire.enabled.unwrap_or(true),
            config: wire.config,
            created_by_did: repo.to_string(),
            disabled_by_did: None,
            disabled_at: None,
            record_uri: record_uri(
                repo,
                covesview_core::collections::AGGREGATOR_AUTHORIZATION,
                rkey,
            ),
            created_at: existing
                .as_ref()
                .map(|a| a.created_at)
                .unwrap_or_else(|| parse_created_at(&wire.created_at)),
            updated_at: now,
        })
        .await?;

    let now_enabled = wire.enabled.unwrap_or(true);
    if now_enabled && !was_enabled {
        store
            .adjust_aggregator_counts(&wire.aggregator, 1, 0)
            .await?;
    } else if !now_enabled && was_enabled {
        store
            .adjust_aggregator_counts(&wire.aggregator, -1, 0)
            .await?;
    }
    Ok(())
}

pub async fn apply_aggregator_authorization_delete(
    store: &dyn RecordStore,
    repo: &str,
    aggregator_did: &str,
) -> AppResult<()> {
    if let Some(auth) = store
        .get_aggregator_authorization(aggregator_did, repo)
        .await?
    {
        if auth.enabled {
            store.adjust_aggregator_counts(aggregator_did, -1, 0).await?;
        }
        store
            .disable_aggregator_authorization(aggregator_did, repo, repo)
            .await?;
    }
    Ok(())
}
