//! Authorization and rate-limiting policy for aggregator-posted content.
//!
//! An aggregator may only post into a community once a community moderator
//! has written an `app.coves.aggregator.authorization` record naming it, and
//! even then it's bound by a per-community rate limit read from that same
//! record's `config`.

use chrono::{Duration as ChronoDuration, Utc};
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::RecordStore;
use covesview_core::types::AggregatorPostTracking;

const DEFAULT_WINDOW_SECS: i64 = 3600;
const DEFAULT_MAX_POSTS_PER_WINDOW: i64 = 10;

struct RateLimitPolicy {
    window_secs: i64,
    max_posts: i64,
}

fn rate_limit_from_config(config: &Option<serde_json::Value>) -> RateLimitPolicy {
    let window_secs = config
        .as_ref()
        .and_then(|c| c.get("windowSecs"))
        .and_then(|v| v.as_i64())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_WINDOW_SECS);
    let max_posts = config
        .as_ref()
        .and_then(|c| c.get("maxPostsPerWindow"))
        .and_then(|v| v.as_i64())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_POSTS_PER_WINDOW);
    RateLimitPolicy {
        window_secs,
        max_posts,
    }
}

/// Check whether `aggregator_did` may post into `community_did` right now.
/// Returns an error naming exactly why when it may not: no authorization,
/// a disabled authorization, or an exhausted rate-limit window.
pub async fn authorize_post(
    store: &dyn RecordStore,
    aggregator_did: &str,
    community_did: &str,
) -> AppResult<()> {
    let auth = store
        .get_aggregator_authorization(aggregator_did, community_did)
        .await?
        .ok_or_else(|| {
            AppError::Authorization(format!(
                "{aggregator_did} is not authorized to post into {community_did}"
            ))
        })?;

    if !auth.enabled {
        return Err(AppError::Authorization(format!(
            "authorization for {aggregator_did} in {community_did} is disabled"
        )));
    }

    let policy = rate_limit_from_config(&auth.config);
    let since = Utc::now() - ChronoDuration::seconds(policy.window_secs);
    let count = store
        .count_aggregator_posts_since(aggregator_did, community_did, since)
        .await?;

    if count >= policy.max_posts {
        return Err(AppError::RateLimited(format!(
            "{aggregator_did} has posted {count} times in the last {}s in {community_did}, limit is {}",
            policy.window_secs, policy.max_posts
        )));
    }

    Ok(())
}

/// Record that `aggregator_did` successfully posted `post_uri` into
/// `community_did`, for rate-limit accounting and the aggregator's lifetime
/// post count.
pub async fn record_post(
    store: &dyn RecordStore,
    aggregator_did: &str,
    community_did: &str,
    post_uri: &str,
) -> AppResult<()> {
    let newly_recorded = store
        .record_aggregator_post(&AggregatorPostTracking {
            aggregator_did: aggregator_did.to_string(),
            community_did: community_did.to_string(),
            post_uri: post_uri.to_string(),
            posted_at: Utc::now(),
        })
        .await?;
    if newly_recorded {
        store.adjust_aggregator_counts(aggregator_did, 0, 1).await?;
    }
    Ok(())
}
