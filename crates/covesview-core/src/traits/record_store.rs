use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::{
    Aggregator, AggregatorAuthorization, AggregatorPostTracking, Comment, Community, Direction,
    Post, Subscription, User, Vote,
};
use chrono::{DateTime, Utc};

/// The single persistence surface for indexed records. Every mutation here
/// is expected to be idempotent with respect to the (collection, rkey) of
/// the record that produced it: replaying a firehose commit must leave the
/// store in the same state as applying it once.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // Users
    async fn upsert_user(&self, user: &User) -> AppResult<()>;
    async fn get_user_by_did(&self, did: &str) -> AppResult<Option<User>>;
    async fn update_handle(&self, did: &str, handle: &str) -> AppResult<()>;

    // Communities
    async fn upsert_community(&self, community: &Community) -> AppResult<()>;
    async fn get_community_by_did(&self, did: &str) -> AppResult<Option<Community>>;
    async fn get_community_by_name(&self, name: &str) -> AppResult<Option<Community>>;
    async fn delete_community(&self, did: &str) -> AppResult<()>;
    async fn adjust_community_subscriber_count(&self, did: &str, delta: i64) -> AppResult<()>;
    async fn adjust_community_member_count(&self, did: &str, delta: i64) -> AppResult<()>;

    // Posts
    async fn upsert_post(&self, post: &Post) -> AppResult<()>;
    async fn get_post_by_uri(&self, uri: &str) -> AppResult<Option<Post>>;
    async fn delete_post(&self, uri: &str) -> AppResult<()>;
    async fn list_posts_by_community(
        &self,
        community_did: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<Post>>;
    async fn adjust_post_vote_count(&self, uri: &str, direction: Direction, delta: i64)
    -> AppResult<()>;
    async fn adjust_post_comment_count(&self, uri: &str, delta: i64) -> AppResult<()>;
    /// Page over a community's posts ordered by score, optionally bounded to
    /// posts created no earlier than `since`. `cursor` is the (score, uri)
    /// of the last row the caller already saw, used as a keyset bound so
    /// ties on score don't skip or repeat rows.
    async fn list_top_posts_by_community(
        &self,
        community_did: &str,
        since: Option<DateTime<Utc>>,
        cursor: Option<(i64, &str)>,
        limit: usize,
    ) -> AppResult<Vec<Post>>;

    // Comments
    async fn upsert_comment(&self, comment: &Comment) -> AppResult<()>;
    async fn get_comment_by_uri(&self, uri: &str) -> AppResult<Option<Comment>>;
    async fn mark_comment_deleted(&self, uri: &str) -> AppResult<()>;
    async fn list_comments_by_root(&self, root_uri: &str) -> AppResult<Vec<Comment>>;
    async fn adjust_comment_vote_count(
        &self,
        uri: &str,
        direction: Direction,
        delta: i64,
    ) -> AppResult<()>;
    async fn adjust_comment_reply_count(&self, uri: &str, delta: i64) -> AppResult<()>;

    // Votes
    async fn upsert_vote(&self, vote: &Vote) -> AppResult<()>;
    async fn get_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<Option<Vote>>;
    /// Look a vote up by its own record URI, used when a firehose delete op
    /// names only the vote record's path and not the subject it targeted.
    async fn get_vote_by_uri(&self, uri: &str) -> AppResult<Option<Vote>>;
    async fn delete_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<()>;

    // Subscriptions
    async fn upsert_subscription(&self, subscription: &Subscription) -> AppResult<()>;
    async fn get_subscription(
        &self,
        user_did: &str,
        community_did: &str,
    ) -> AppResult<Option<Subscription>>;
    async fn delete_subscription(&self, user_did: &str, community_did: &str) -> AppResult<()>;
    async fn list_subscriptions_by_user(&self, user_did: &str) -> AppResult<Vec<Subscription>>;

    // Aggregators
    async fn upsert_aggregator(&self, aggregator: &Aggregator) -> AppResult<()>;
    async fn get_aggregator_by_did(&self, did: &str) -> AppResult<Option<Aggregator>>;
    async fn adjust_aggregator_counts(
        &self,
        did: &str,
        communities_delta: i64,
        posts_delta: i64,
    ) -> AppResult<()>;

    // Aggregator authorizations
    async fn upsert_aggregator_authorization(
        &self,
        auth: &AggregatorAuthorization,
    ) -> AppResult<()>;
    async fn get_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
    ) -> AppResult<Option<AggregatorAuthorization>>;
    async fn disable_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
        disabled_by_did: &str,
    ) -> AppResult<()>;

    // Aggregator post tracking (rate limiting + dedup). Returns true iff this
    // call actually inserted a new tracking row (false if already recorded),
    // so callers only adjust the aggregator's lifetime post count once.
    async fn record_aggregator_post(&self, tracking: &AggregatorPostTracking) -> AppResult<bool>;
    async fn count_aggregator_posts_since(
        &self,
        aggregator_did: &str,
        community_did: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<i64>;
}
