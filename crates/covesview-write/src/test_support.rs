use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::{DataServerClient, RecordStore};
use covesview_core::types::{
    Aggregator, AggregatorAuthorization, AggregatorPostTracking, Comment, Community, Direction,
    Post, StrongRef, Subscription, User, Vote,
};
use serde_json::{Value, json};

/// In-memory record store for exercising write services without a database.
#[derive(Default)]
pub struct FakeStore {
    pub users: Mutex<HashMap<String, User>>,
    pub communities: Mutex<HashMap<String, Community>>,
    pub posts: Mutex<HashMap<String, Post>>,
    pub comments: Mutex<HashMap<String, Comment>>,
    pub votes: Mutex<HashMap<String, Vote>>,
    pub subscriptions: Mutex<HashMap<(String, String), Subscription>>,
    pub aggregators: Mutex<HashMap<String, Aggregator>>,
    pub authorizations: Mutex<HashMap<(String, String), AggregatorAuthorization>>,
    pub post_tracking: Mutex<Vec<AggregatorPostTracking>>,
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn upsert_user(&self, user: &User) -> AppResult<()> {
        self.users.lock().unwrap().insert(user.did.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_did(&self, did: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(did).cloned())
    }

    async fn update_handle(&self, did: &str, handle: &str) -> AppResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(did) {
            user.handle = handle.to_string();
        }
        Ok(())
    }

    async fn upsert_community(&self, community: &Community) -> AppResult<()> {
        self.communities
            .lock()
            .unwrap()
            .insert(community.did.clone(), community.clone());
        Ok(())
    }

    async fn get_community_by_did(&self, did: &str) -> AppResult<Option<Community>> {
        Ok(self.communities.lock().unwrap().get(did).cloned())
    }

    async fn get_community_by_name(&self, name: &str) -> AppResult<Option<Community>> {
        Ok(self
            .communities
            .lock()
            .unwrap()
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn delete_community(&self, did: &str) -> AppResult<()> {
        self.communities.lock().unwrap().remove(did);
        Ok(())
    }

    async fn adjust_community_subscriber_count(&self, did: &str, delta: i64) -> AppResult<()> {
        if let Some(c) = self.communities.lock().unwrap().get_mut(did) {
            c.subscriber_count += delta;
        }
        Ok(())
    }

    async fn adjust_community_member_count(&self, did: &str, delta: i64) -> AppResult<()> {
        if let Some(c) = self.communities.lock().unwrap().get_mut(did) {
            c.member_count += delta;
        }
        Ok(())
    }

    async fn upsert_post(&self, post: &Post) -> AppResult<()> {
        self.posts.lock().unwrap().insert(post.uri.clone(), post.clone());
        Ok(())
    }

    async fn get_post_by_uri(&self, uri: &str) -> AppResult<Option<Post>> {
        Ok(self.posts.lock().unwrap().get(uri).cloned())
    }

    async fn delete_post(&self, uri: &str) -> AppResult<()> {
        self.posts.lock().unwrap().remove(uri);
        Ok(())
    }

    async fn list_posts_by_community(
        &self,
        community_did: &str,
        _cursor: Option<&str>,
        _limit: usize,
    ) -> AppResult<Vec<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.community_did == community_did)
            .cloned()
            .collect())
    }

    async fn adjust_post_vote_count(
        &self,
        uri: &str,
        direction: Direction,
        delta: i64,
    ) -> AppResult<()> {
        if let Some(p) = self.posts.lock().unwrap().get_mut(uri) {
            match direction {
                Direction::Up => p.upvote_count += delta,
                Direction::Down => p.downvote_count += delta,
            }
        }
        Ok(())
    }

    async fn adjust_post_comment_count(&self, uri: &str, delta: i64) -> AppResult<()> {
        if let Some(p) = self.posts.lock().unwrap().get_mut(uri) {
            p.comment_count += delta;
        }
        Ok(())
    }

    async fn list_top_posts_by_community(
        &self,
        community_did: &str,
        since: Option<DateTime<Utc>>,
        cursor: Option<(i64, &str)>,
        limit: usize,
    ) -> AppResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.community_did == community_did)
            .filter(|p| match since {
                Some(since) => p.created_at >= since,
                None => true,
            })
            .filter(|p| match cursor {
                Some((score, uri)) => p.score < score || (p.score == score && p.uri.as_str() > uri),
                None => true,
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.uri.cmp(&b.uri)));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn upsert_comment(&self, comment: &Comment) -> AppResult<()> {
        self.comments
            .lock()
            .unwrap()
            .insert(comment.uri.clone(), comment.clone());
        Ok(())
    }

    async fn get_comment_by_uri(&self, uri: &str) -> AppResult<Option<Comment>> {
        Ok(self.comments.lock().unwrap().get(uri).cloned())
    }

    async fn mark_comment_deleted(&self, uri: &str) -> AppResult<()> {
        if let Some(c) = self.comments.lock().unwrap().get_mut(uri) {
            c.deleted = true;
        }
        Ok(())
    }

    async fn list_comments_by_root(&self, root_uri: &str) -> AppResult<Vec<Comment>> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.root_uri == root_uri)
            .cloned()
            .collect())
    }

    async fn adjust_comment_vote_count(
        &self,
        uri: &str,
        direction: Direction,
        delta: i64,
    ) -> AppResult<()> {
        if let Some(c) = self.comments.lock().unwrap().get_mut(uri) {
            match direction {
                Direction::Up => c.upvote_count += delta,
                Direction::Down => c.downvote_count += delta,
            }
        }
        Ok(())
    }

    async fn adjust_comment_reply_count(&self, uri: &str, delta: i64) -> AppResult<()> {
        if let Some(c) = self.comments.lock().unwrap().get_mut(uri) {
            c.reply_count += delta;
        }
        Ok(())
    }

    async fn upsert_vote(&self, vote: &Vote) -> AppResult<()> {
        self.votes.lock().unwrap().insert(vote.uri.clone(), vote.clone());
        Ok(())
    }

    async fn get_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<Option<Vote>> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .values()
            .find(|v| v.voter_did == voter_did && v.subject_uri == subject_uri)
            .cloned())
    }

    async fn get_vote_by_uri(&self, uri: &str) -> AppResult<Option<Vote>> {
        Ok(self.votes.lock().unwrap().get(uri).cloned())
    }

    async fn delete_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<()> {
        self.votes
            .lock()
            .unwrap()
            .retain(|_, v| !(v.voter_did == voter_did && v.subject_uri == subject_uri));
        Ok(())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        self.subscriptions.lock().unwrap().insert(
            (subscription.user_did.clone(), subscription.community_did.clone()),
            subscription.clone(),
        );
        Ok(())
    }

    async fn get_subscription(
        &self,
        user_did: &str,
        community_did: &str,
    ) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(&(user_did.to_string(), community_did.to_string()))
            .cloned())
    }

    async fn delete_subscription(&self, user_did: &str, community_did: &str) -> AppResult<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .remove(&(user_did.to_string(), community_did.to_string()));
        Ok(())
    }

    async fn list_subscriptions_by_user(&self, user_did: &str) -> AppResult<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_did == user_did)
            .cloned()
            .collect())
    }

    async fn upsert_aggregator(&self, aggregator: &Aggregator) -> AppResult<()> {
        self.aggregators
            .lock()
            .unwrap()
            .insert(aggregator.did.clone(), aggregator.clone());
        Ok(())
    }

    async fn get_aggregator_by_did(&self, did: &str) -> AppResult<Option<Aggregator>> {
        Ok(self.aggregators.lock().unwrap().get(did).cloned())
    }

    async fn adjust_aggregator_counts(
        &self,
        did: &str,
        communities_delta: i64,
        posts_delta: i64,
    ) -> AppResult<()> {
        if let Some(a) = self.aggregators.lock().unwrap().get_mut(did) {
            a.communities_using += communities_delta;
            a.posts_created += posts_delta;
        }
        Ok(())
    }

    async fn upsert_aggregator_authorization(&self, auth: &AggregatorAuthorization) -> AppResult<()> {
        self.authorizations.lock().unwrap().insert(
            (auth.aggregator_did.clone(), auth.community_did.clone()),
            auth.clone(),
        );
        Ok(())
    }

    async fn get_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
    ) -> AppResult<Option<AggregatorAuthorization>> {
        Ok(self
            .authorizations
            .lock()
            .unwrap()
            .get(&(aggregator_did.to_string(), community_did.to_string()))
            .cloned())
    }

    async fn disable_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
        disabled_by_did: &str,
    ) -> AppResult<()> {
        if let Some(auth) = self
            .authorizations
            .lock()
            .unwrap()
            .get_mut(&(aggregator_did.to_string(), community_did.to_string()))
        {
            auth.enabled = false;
            auth.disabled_by_did = Some(disabled_by_did.to_string());
            auth.disabled_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_aggregator_post(&self, tracking: &AggregatorPostTracking) -> AppResult<bool> {
        let mut posts = self.post_tracking.lock().unwrap();
        let already = posts.iter().any(|t| t.post_uri == tracking.post_uri);
        if already {
            return Ok(false);
        }
        posts.push(tracking.clone());
        Ok(true)
    }

    async fn count_aggregator_posts_since(
        &self,
        aggregator_did: &str,
        community_did: &str,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        Ok(self
            .post_tracking
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.aggregator_did == aggregator_did && t.community_did == community_did && t.posted_at >= since
            })
            .count() as i64)
    }
}

/// In-memory data-server client. `fail_conflict` makes the next `put_record`
/// call with a `swap_cid` set return `AppError::Conflict`, simulating a
/// racing concurrent edit.
#[derive(Default)]
pub struct FakeDataServer {
    pub records: Mutex<HashMap<(String, String, String), Value>>,
    pub fail_conflict: Mutex<bool>,
}

#[async_trait]
impl DataServerClient for FakeDataServer {
    async fn get_record(
        &self,
        _data_server: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<Option<Value>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(did.to_string(), collection.to_string(), rkey.to_string()))
            .cloned())
    }

    async fn put_record(
        &self,
        _data_server: &str,
        _access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
        record: Value,
        swap_cid: Option<&str>,
    ) -> AppResult<StrongRef> {
        if swap_cid.is_some() && *self.fail_conflict.lock().unwrap() {
            return Err(AppError::Conflict(format!("concurrent modification at {collection}/{rkey}")));
        }
        self.records
            .lock()
            .unwrap()
            .insert((did.to_string(), collection.to_string(), rkey.to_string()), record);
        Ok(StrongRef {
            uri: format!("at://{did}/{collection}/{rkey}"),
            cid: format!("bafyfake{rkey}"),
        })
    }

    async fn delete_record(
        &self,
        _data_server: &str,
        _access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<()> {
        self.records
            .lock()
            .unwrap()
            .remove(&(did.to_string(), collection.to_string(), rkey.to_string()));
        Ok(())
    }

    async fn upload_blob(
        &self,
        _data_server: &str,
        _access_token: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Value> {
        Ok(json!({
            "ref": { "$link": format!("bafyblob{}", bytes.len()) },
            "mimeType": mime_type,
            "size": bytes.len(),
        }))
    }
}

pub fn sample_community(did: &str) -> Community {
    Community {
        did: did.to_string(),
        handle: "test.community".to_string(),
        name: "testcommunity".to_string(),
        display_name: "Test Community".to_string(),
        description: Some("a place for tests".to_string()),
        owner_did: "did:plc:owner".to_string(),
        created_by_did: "did:plc:owner".to_string(),
        hosted_by_did: "did:plc:owner".to_string(),
        visibility: covesview_core::types::Visibility::Public,
        moderation_type: "open".to_string(),
        external_discovery: true,
        record_uri: format!("at://{did}/app.coves.community.declaration/self"),
        record_cid: "bafyoriginal".to_string(),
        avatar_cid: None,
        banner_cid: None,
        subscriber_count: 0,
        member_count: 0,
        data_server: "https://ds.example".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
