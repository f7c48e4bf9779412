use async_trait::async_trait;
use sqlx::Row;

use covesview_core::traits::RecordStore;
use covesview_core::types::{
    Aggregator, AggregatorAuthorization, AggregatorPostTracking, Comment, Community, Direction,
    Post, Subscription, User, Vote, Visibility,
};
use covesview_core::{AppError, AppResult};

use crate::mapping::{format_datetime, format_json_opt, parse_datetime, parse_json_opt};
use crate::store::SqliteStore;

fn storage_err(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> AppResult<User> {
    Ok(User {
        did: row.try_get("did").map_err(storage_err)?,
        handle: row.try_get("handle").map_err(storage_err)?,
        data_server: row.try_get("data_server").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
    })
}

fn row_to_community(row: &sqlx::sqlite::SqliteRow) -> AppResult<Community> {
    Ok(Community {
        did: row.try_get("did").map_err(storage_err)?,
        handle: row.try_get("handle").map_err(storage_err)?,
        name: row.try_get("name").map_err(storage_err)?,
        display_name: row.try_get("display_name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        owner_did: row.try_get("owner_did").map_err(storage_err)?,
        created_by_did: row.try_get("created_by_did").map_err(storage_err)?,
        hosted_by_did: row.try_get("hosted_by_did").map_err(storage_err)?,
        visibility: Visibility::parse(&row.try_get::<String, _>("visibility").map_err(storage_err)?),
        moderation_type: row.try_get("moderation_type").map_err(storage_err)?,
        external_discovery: row.try_get::<i64, _>("external_discovery").map_err(storage_err)? != 0,
        record_uri: row.try_get("record_uri").map_err(storage_err)?,
        record_cid: row.try_get("record_cid").map_err(storage_err)?,
        avatar_cid: row.try_get("avatar_cid").map_err(storage_err)?,
        banner_cid: row.try_get("banner_cid").map_err(storage_err)?,
        subscriber_count: row.try_get("subscriber_count").map_err(storage_err)?,
        member_count: row.try_get("member_count").map_err(storage_err)?,
        data_server: row.try_get("data_server").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
    })
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> AppResult<Post> {
    Ok(Post {
        uri: row.try_get("uri").map_err(storage_err)?,
        cid: row.try_get("cid").map_err(storage_err)?,
        rkey: row.try_get("rkey").map_err(storage_err)?,
        author_did: row.try_get("author_did").map_err(storage_err)?,
        community_did: row.try_get("community_did").map_err(storage_err)?,
        title: row.try_get("title").map_err(storage_err)?,
        content: row.try_get("content").map_err(storage_err)?,
        embed: parse_json_opt(row.try_get::<Option<String>, _>("embed").map_err(storage_err)?.as_deref())?,
        upvote_count: row.try_get("upvote_count").map_err(storage_err)?,
        downvote_count: row.try_get("downvote_count").map_err(storage_err)?,
        comment_count: row.try_get("comment_count").map_err(storage_err)?,
        score: row.try_get("score").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
        indexed_at: parse_datetime(&row.try_get::<String, _>("indexed_at").map_err(storage_err)?)?,
    })
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> AppResult<Comment> {
    Ok(Comment {
        uri: row.try_get("uri").map_err(storage_err)?,
        cid: row.try_get("cid").map_err(storage_err)?,
        commenter_did: row.try_get("commenter_did").map_err(storage_err)?,
        root_uri: row.try_get("root_uri").map_err(storage_err)?,
        root_cid: row.try_get("root_cid").map_err(storage_err)?,
        parent_uri: row.try_get("parent_uri").map_err(storage_err)?,
        parent_cid: row.try_get("parent_cid").map_err(storage_err)?,
        content: row.try_get("content").map_err(storage_err)?,
        embed: parse_json_opt(row.try_get::<Option<String>, _>("embed").map_err(storage_err)?.as_deref())?,
        upvote_count: row.try_get("upvote_count").map_err(storage_err)?,
        downvote_count: row.try_get("downvote_count").map_err(storage_err)?,
        reply_count: row.try_get("reply_count").map_err(storage_err)?,
        score: row.try_get("score").map_err(storage_err)?,
        deleted: row.try_get::<i64, _>("deleted").map_err(storage_err)? != 0,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
    })
}

fn row_to_vote(row: &sqlx::sqlite::SqliteRow) -> AppResult<Vote> {
    let direction_str: String = row.try_get("direction").map_err(storage_err)?;
    let direction = Direction::parse(&direction_str)
        .ok_or_else(|| AppError::Storage(format!("invalid vote direction: {direction_str}")))?;
    Ok(Vote {
        uri: row.try_get("uri").map_err(storage_err)?,
        voter_did: row.try_get("voter_did").map_err(storage_err)?,
        subject_uri: row.try_get("subject_uri").map_err(storage_err)?,
        subject_cid: row.try_get("subject_cid").map_err(storage_err)?,
        direction,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
    })
}

fn row_to_subscription(row: &sqlx::sqlite::SqliteRow) -> AppResult<Subscription> {
    Ok(Subscription {
        user_did: row.try_get("user_did").map_err(storage_err)?,
        community_did: row.try_get("community_did").map_err(storage_err)?,
        content_visibility: row.try_get("content_visibility").map_err(storage_err)?,
        record_uri: row.try_get("record_uri").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
    })
}

fn row_to_aggregator(row: &sqlx::sqlite::SqliteRow) -> AppResult<Aggregator> {
    Ok(Aggregator {
        did: row.try_get("did").map_err(storage_err)?,
        display_name: row.try_get("display_name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        maintainer_did: row.try_get("maintainer_did").map_err(storage_err)?,
        source_url: row.try_get("source_url").map_err(storage_err)?,
        config_schema: parse_json_opt(
            row.try_get::<Option<String>, _>("config_schema").map_err(storage_err)?.as_deref(),
        )?,
        record_uri: row.try_get("record_uri").map_err(storage_err)?,
        communities_using: row.try_get("communities_using").map_err(storage_err)?,
        posts_created: row.try_get("posts_created").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
    })
}

fn row_to_aggregator_authorization(
    row: &sqlx::sqlite::SqliteRow,
) -> AppResult<AggregatorAuthorization> {
    Ok(AggregatorAuthorization {
        aggregator_did: row.try_get("aggregator_did").map_err(storage_err)?,
        community_did: row.try_get("community_did").map_err(storage_err)?,
        enabled: row.try_get::<i64, _>("enabled").map_err(storage_err)? != 0,
        config: parse_json_opt(row.try_get::<Option<String>, _>("config").map_err(storage_err)?.as_deref())?,
        created_by_did: row.try_get("created_by_did").map_err(storage_err)?,
        disabled_by_did: row.try_get("disabled_by_did").map_err(storage_err)?,
        disabled_at: {
            let s: Option<String> = row.try_get("disabled_at").map_err(storage_err)?;
            match s {
                Some(s) => Some(parse_datetime(&s)?),
                None => None,
            }
        },
        record_uri: row.try_get("record_uri").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(storage_err)?)?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert_user(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (did, handle, data_server, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(did) DO UPDATE SET
                handle = excluded.handle,
                data_server = excluded.data_server,
                updated_at = excluded.updated_at",
        )
        .bind(&user.did)
        .bind(&user.handle)
        .bind(&user.data_server)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_user_by_did(&self, did: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE did = ?")
            .bind(did)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_handle(&self, did: &str, handle: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET handle = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE did = ?",
        )
        .bind(handle)
        .bind(did)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_community(&self, community: &Community) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO communities (
                did, handle, name, display_name, description, owner_did, created_by_did,
                hosted_by_did, visibility, moderation_type, external_discovery, record_uri,
                record_cid, avatar_cid, banner_cid, subscriber_count, member_count,
                data_server, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(did) DO UPDATE SET
                handle = excluded.handle,
                name = excluded.name,
                display_name = excluded.display_name,
                description = excluded.description,
                visibility = excluded.visibility,
                moderation_type = excluded.moderation_type,
                external_discovery = excluded.external_discovery,
                record_uri = excluded.record_uri,
                record_cid = excluded.record_cid,
                avatar_cid = excluded.avatar_cid,
                banner_cid = excluded.banner_cid,
                updated_at = excluded.updated_at",
        )
        .bind(&community.did)
        .bind(&community.handle)
        .bind(&community.name)
        .bind(&community.display_name)
        .bind(&community.description)
        .bind(&community.owner_did)
        .bind(&community.created_by_did)
        .bind(&community.hosted_by_did)
        .bind(community.visibility.as_str())
        .bind(&community.moderation_type)
        .bind(community.external_discovery as i64)
        .bind(&community.record_uri)
        .bind(&community.record_cid)
        .bind(&community.avatar_cid)
        .bind(&community.banner_cid)
        .bind(community.subscriber_count)
        .bind(community.member_count)
        .bind(&community.data_server)
        .bind(format_datetime(&community.created_at))
        .bind(format_datetime(&community.updated_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_community_by_did(&self, did: &str) -> AppResult<Option<Community>> {
        let row = sqlx::query("SELECT * FROM communities WHERE did = ?")
            .bind(did)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_community).transpose()
    }

    async fn get_community_by_name(&self, name: &str) -> AppResult<Option<Community>> {
        let row = sqlx::query("SELECT * FROM communities WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_community).transpose()
    }

    async fn delete_community(&self, did: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM communities WHERE did = ?")
            .bind(did)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn adjust_community_subscriber_count(&self, did: &str, delta: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE communities SET subscriber_count = MAX(0, subscriber_count + ?) WHERE did = ?",
        )
        .bind(delta)
        .bind(did)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn adjust_community_member_count(&self, did: &str, delta: i64) -> AppResult<()> {
        sqlx::query("UPDATE communities SET member_count = MAX(0, member_count + ?) WHERE did = ?")
            .bind(delta)
            .bind(did)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (
                uri, cid, rkey, author_did, community_did, title, content, embed,
                upvote_count, downvote_count, comment_count, score,
                created_at, updated_at, indexed_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(uri) DO UPDATE SET
                cid = excluded.cid,
                title = excluded.title,
                content = excluded.content,
                embed = excluded.embed,
                updated_at = excluded.updated_at",
        )
        .bind(&post.uri)
        .bind(&post.cid)
        .bind(&post.rkey)
        .bind(&post.author_did)
        .bind(&post.community_did)
        .bind(&post.title)
        .bind(&post.content)
        .bind(format_json_opt(&post.embed))
        .bind(post.upvote_count)
        .bind(post.downvote_count)
        .bind(post.comment_count)
        .bind(post.score)
        .bind(format_datetime(&post.created_at))
        .bind(format_datetime(&post.updated_at))
        .bind(format_datetime(&post.indexed_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_post_by_uri(&self, uri: &str) -> AppResult<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn delete_post(&self, uri: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM posts WHERE uri = ?")
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn list_posts_by_community(
        &self,
        community_did: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<Post>> {
        let rows = if let Some(cursor) = cursor {
            sqlx::query(
                "SELECT * FROM posts WHERE community_did = ? AND created_at < ?
                 ORDER BY created_at DESC LIMIT ?",
            )
            .bind(community_did)
            .bind(cursor)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?
        } else {
            sqlx::query(
                "SELECT * FROM posts WHERE community_did = ? ORDER BY created_at DESC LIMIT ?",
            )
            .bind(community_did)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?
        };
        rows.iter().map(row_to_post).collect()
    }

    async fn list_top_posts_by_community(
        &self,
        community_did: &str,
        since: Option<chrono::DateTime<chrono::Utc>>,
        cursor: Option<(i64, &str)>,
        limit: usize,
    ) -> AppResult<Vec<Post>> {
        let since_bound = since.map(|s| format_datetime(&s));
        let rows = match (&since_bound, cursor) {
            (Some(since), Some((score, uri))) => {
                sqlx::query(
                    "SELECT * FROM posts WHERE community_did = ? AND created_at >= ?
                     AND (score < ? OR (score = ? AND uri > ?))
                     ORDER BY score DESC, uri ASC LIMIT ?",
                )
                .bind(community_did)
                .bind(since)
                .bind(score)
                .bind(score)
                .bind(uri)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?
            }
            (Some(since), None) => {
                sqlx::query(
                    "SELECT * FROM posts WHERE community_did = ? AND created_at >= ?
                     ORDER BY score DESC, uri ASC LIMIT ?",
                )
                .bind(community_did)
                .bind(since)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?
            }
            (None, Some((score, uri))) => {
                sqlx::query(
                    "SELECT * FROM posts WHERE community_did = ?
                     AND (score < ? OR (score = ? AND uri > ?))
                     ORDER BY score DESC, uri ASC LIMIT ?",
                )
                .bind(community_did)
                .bind(score)
                .bind(score)
                .bind(uri)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?
            }
            (None, None) => {
                sqlx::query(
                    "SELECT * FROM posts WHERE community_did = ? ORDER BY score DESC, uri ASC LIMIT ?",
                )
                .bind(community_did)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?
            }
        };
        rows.iter().map(row_to_post).collect()
    }

    async fn adjust_post_vote_count(
        &self,
        uri: &str,
        direction: Direction,
        delta: i64,
    ) -> AppResult<()> {
        let column = match direction {
            Direction::Up => "upvote_count",
            Direction::Down => "downvote_count",
        };
        let sql = format!(
            "UPDATE posts SET {column} = MAX(0, {column} + ?), score = upvote_count - downvote_count WHERE uri = ?"
        );
        sqlx::query(&sql)
            .bind(delta)
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn adjust_post_comment_count(&self, uri: &str, delta: i64) -> AppResult<()> {
        sqlx::query("UPDATE posts SET comment_count = MAX(0, comment_count + ?) WHERE uri = ?")
            .bind(delta)
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_comment(&self, comment: &Comment) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO comments (
                uri, cid, commenter_did, root_uri, root_cid, parent_uri, parent_cid,
                content, embed, upvote_count, downvote_count, reply_count, score,
                deleted, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(uri) DO UPDATE SET
                cid = excluded.cid,
                content = excluded.content,
                embed = excluded.embed,
                updated_at = excluded.updated_at",
        )
        .bind(&comment.uri)
        .bind(&comment.cid)
        .bind(&comment.commenter_did)
        .bind(&comment.root_uri)
        .bind(&comment.root_cid)
        .bind(&comment.parent_uri)
        .bind(&comment.parent_cid)
        .bind(&comment.content)
        .bind(format_json_opt(&comment.embed))
        .bind(comment.upvote_count)
        .bind(comment.downvote_count)
        .bind(comment.reply_count)
        .bind(comment.score)
        .bind(comment.deleted as i64)
        .bind(format_datetime(&comment.created_at))
        .bind(format_datetime(&comment.updated_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_comment_by_uri(&self, uri: &str) -> AppResult<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_comment).transpose()
    }

    async fn mark_comment_deleted(&self, uri: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE comments SET deleted = 1, content = '', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE uri = ?",
        )
        .bind(uri)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_comments_by_root(&self, root_uri: &str) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE root_uri = ? ORDER BY created_at ASC")
            .bind(root_uri)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_comment).collect()
    }

    async fn adjust_comment_vote_count(
        &self,
        uri: &str,
        direction: Direction,
        delta: i64,
    ) -> AppResult<()> {
        let column = match direction {
            Direction::Up => "upvote_count",
            Direction::Down => "downvote_count",
        };
        let sql = format!(
            "UPDATE comments SET {column} = MAX(0, {column} + ?), score = upvote_count - downvote_count WHERE uri = ?"
        );
        sqlx::query(&sql)
            .bind(delta)
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn adjust_comment_reply_count(&self, uri: &str, delta: i64) -> AppResult<()> {
        sqlx::query("UPDATE comments SET reply_count = MAX(0, reply_count + ?) WHERE uri = ?")
            .bind(delta)
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_vote(&self, vote: &Vote) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO votes (uri, voter_did, subject_uri, subject_cid, direction, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(voter_did, subject_uri) DO UPDATE SET
                uri = excluded.uri,
                subject_cid = excluded.subject_cid,
                direction = excluded.direction,
                created_at = excluded.created_at",
        )
        .bind(&vote.uri)
        .bind(&vote.voter_did)
        .bind(&vote.subject_uri)
        .bind(&vote.subject_cid)
        .bind(vote.direction.as_str())
        .bind(format_datetime(&vote.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<Option<Vote>> {
        let row = sqlx::query("SELECT * FROM votes WHERE voter_did = ? AND subject_uri = ?")
            .bind(voter_did)
            .bind(subject_uri)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_vote).transpose()
    }

    async fn get_vote_by_uri(&self, uri: &str) -> AppResult<Option<Vote>> {
        let row = sqlx::query("SELECT * FROM votes WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_vote).transpose()
    }

    async fn delete_vote(&self, voter_did: &str, subject_uri: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM votes WHERE voter_did = ? AND subject_uri = ?")
            .bind(voter_did)
            .bind(subject_uri)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO subscriptions (user_did, community_did, content_visibility, record_uri, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_did, community_did) DO UPDATE SET
                content_visibility = excluded.content_visibility,
                record_uri = excluded.record_uri",
        )
        .bind(&subscription.user_did)
        .bind(&subscription.community_did)
        .bind(subscription.content_visibility)
        .bind(&subscription.record_uri)
        .bind(format_datetime(&subscription.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_subscription(
        &self,
        user_did: &str,
        community_did: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE user_did = ? AND community_did = ?")
            .bind(user_did)
            .bind(community_did)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    async fn delete_subscription(&self, user_did: &str, community_did: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE user_did = ? AND community_did = ?")
            .bind(user_did)
            .bind(community_did)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn list_subscriptions_by_user(&self, user_did: &str) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query("SELECT * FROM subscriptions WHERE user_did = ?")
            .bind(user_did)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_subscription).collect()
    }

    async fn upsert_aggregator(&self, aggregator: &Aggregator) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO aggregators (
                did, display_name, description, maintainer_did, source_url, config_schema,
                record_uri, communities_using, posts_created, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(did) DO UPDATE SET
                display_name = excluded.display_name,
                description = excluded.description,
                maintainer_did = excluded.maintainer_did,
                source_url = excluded.source_url,
                config_schema = excluded.config_schema,
                record_uri = excluded.record_uri,
                updated_at = excluded.updated_at",
        )
        .bind(&aggregator.did)
        .bind(&aggregator.display_name)
        .bind(&aggregator.description)
        .bind(&aggregator.maintainer_did)
        .bind(&aggregator.source_url)
        .bind(format_json_opt(&aggregator.config_schema))
        .bind(&aggregator.record_uri)
        .bind(aggregator.communities_using)
        .bind(aggregator.posts_created)
        .bind(format_datetime(&aggregator.created_at))
        .bind(format_datetime(&aggregator.updated_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_aggregator_by_did(&self, did: &str) -> AppResult<Option<Aggregator>> {
        let row = sqlx::query("SELECT * FROM aggregators WHERE did = ?")
            .bind(did)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_aggregator).transpose()
    }

    async fn adjust_aggregator_counts(
        &self,
        did: &str,
        communities_delta: i64,
        posts_delta: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE aggregators SET
                communities_using = MAX(0, communities_using + ?),
                posts_created = MAX(0, posts_created + ?)
             WHERE did = ?",
        )
        .bind(communities_delta)
        .bind(posts_delta)
        .bind(did)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_aggregator_authorization(
        &self,
        auth: &AggregatorAuthorization,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO aggregator_authorizations (
                aggregator_did, community_did, enabled, config, created_by_did,
                disabled_by_did, disabled_at, record_uri, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(aggregator_did, community_did) DO UPDATE SET
                enabled = excluded.enabled,
                config = excluded.config,
                disabled_by_did = excluded.disabled_by_did,
                disabled_at = excluded.disabled_at,
                record_uri = excluded.record_uri,
                updated_at = excluded.updated_at",
        )
        .bind(&auth.aggregator_did)
        .bind(&auth.community_did)
        .bind(auth.enabled as i64)
        .bind(format_json_opt(&auth.config))
        .bind(&auth.created_by_did)
        .bind(&auth.disabled_by_did)
        .bind(auth.disabled_at.map(|d| format_datetime(&d)))
        .bind(&auth.record_uri)
        .bind(format_datetime(&auth.created_at))
        .bind(format_datetime(&auth.updated_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
    ) -> AppResult<Option<AggregatorAuthorization>> {
        let row = sqlx::query(
            "SELECT * FROM aggregator_authorizations WHERE aggregator_did = ? AND community_did = ?",
        )
        .bind(aggregator_did)
        .bind(community_did)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.as_ref().map(row_to_aggregator_authorization).transpose()
    }

    async fn disable_aggregator_authorization(
        &self,
        aggregator_did: &str,
        community_did: &str,
        disabled_by_did: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE aggregator_authorizations SET
                enabled = 0,
                disabled_by_did = ?,
                disabled_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE aggregator_did = ? AND community_did = ?",
        )
        .bind(disabled_by_did)
        .bind(aggregator_did)
        .bind(community_did)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn record_aggregator_post(&self, tracking: &AggregatorPostTracking) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO aggregator_post_tracking
                (aggregator_did, community_did, post_uri, posted_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&tracking.aggregator_did)
        .bind(&tracking.community_did)
        .bind(&tracking.post_uri)
        .bind(format_datetime(&tracking.posted_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_aggregator_posts_since(
        &self,
        aggregator_did: &str,
        community_did: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM aggregator_post_tracking
             WHERE aggregator_did = ? AND community_did = ? AND posted_at >= ?",
        )
        .bind(aggregator_did)
        .bind(community_did)
        .bind(format_datetime(&since))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        row.try_get("n").map_err(storage_err)
    }
}
