//! Feed assembly: paging over a community's posts under `new`, `hot`, or
//! `top[timeframe]` ordering, decorated with the viewer's own vote.

use chrono::Utc;
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::RecordStore;
use covesview_core::types::{FeedSort, Post, TopTimeframe};
use covesview_crypto::{decode_cursor, encode_cursor};
use serde::Serialize;

use crate::ranking::{hot_score, sort_by_hot};
use crate::viewer::{ViewerVote, viewer_vote};

/// The width of the recency window pulled as ranking candidates for `hot`.
/// Hot scores decay fast enough that a post outside this window essentially
/// never outranks one inside it, so a bounded candidate set is sufficient
/// without needing to rank the whole community in memory.
const HOT_CANDIDATE_WINDOW: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub community_did: String,
    pub title: String,
    pub content: Option<String>,
    pub embed: Option<serde_json::Value>,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    pub score: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub viewer: Option<ViewerVote>,
}

impl PostView {
    fn from_post(post: Post, viewer: Option<ViewerVote>) -> Self {
        PostView {
            uri: post.uri,
            cid: post.cid,
            author_did: post.author_did,
            community_did: post.community_did,
            title: post.title,
            content: post.content,
            embed: post.embed,
            upvote_count: post.upvote_count,
            downvote_count: post.downvote_count,
            comment_count: post.comment_count,
            score: post.score,
            created_at: post.created_at,
            viewer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub cursor: Option<String>,
}

/// Assemble one page of a community feed.
///
/// `cursor`, when present, is the opaque cursor returned by a previous call
/// to this function; it's decoded and verified against `cursor_secret`
/// before use, so a tampered cursor fails closed rather than silently
/// producing a wrong page.
pub async fn assemble_feed(
    store: &dyn RecordStore,
    cursor_secret: &[u8],
    community_did: &str,
    sort: FeedSort,
    viewer_did: Option<&str>,
    cursor: Option<&str>,
    limit: usize,
) -> AppResult<FeedPage> {
    let limit = limit.clamp(1, 100);

    let posts = match sort {
        FeedSort::New => {
            let after = decode_sort_cursor(cursor_secret, cursor)?;
            store
                .list_posts_by_community(community_did, after.as_deref(), limit)
                .await?
        }
        FeedSort::Top(timeframe) => {
            let since = timeframe.since(Utc::now());
            let after = decode_score_cursor(cursor_secret, cursor)?;
            store
                .list_top_posts_by_community(
                    community_did,
                    since,
                    after.as_ref().map(|(score, uri)| (*score, uri.as_str())),
                    limit,
                )
                .await?
        }
        FeedSort::Hot => {
            let since = TopTimeframe::Week.since(Utc::now());
            let mut candidates = store
                .list_top_posts_by_community(community_did, since, None, HOT_CANDIDATE_WINDOW)
                .await?;
            sort_by_hot(&mut candidates, |p| (hot_score(p.score, p.created_at), p.uri.as_str()));
            let resume_after = match cursor {
                Some(c) => Some(
                    decode_cursor(cursor_secret, c)
                        .map_err(|_| AppError::Validation("invalid cursor".to_string()))?,
                ),
                None => None,
            };
            let start = match &resume_after {
                Some((_, uri)) => candidates.iter().position(|p| &p.uri == uri).map(|i| i + 1).unwrap_or(0),
                None => 0,
            };
            candidates.into_iter().skip(start).take(limit).collect()
        }
    };

    let mut views = Vec::with_capacity(posts.len());
    for post in &posts {
        let viewer = viewer_vote(store, viewer_did, &post.uri).await?;
        views.push(PostView::from_post(post.clone(), viewer));
    }

    let next_cursor = match (sort, posts.last()) {
        (_, None) => None,
        (FeedSort::New, Some(last)) => Some(encode_cursor(
            cursor_secret,
            &last.created_at.to_rfc3339(),
            &last.uri,
        )),
        (FeedSort::Top(_), Some(last)) => {
            Some(encode_cursor(cursor_secret, &last.score.to_string(), &last.uri))
        }
        (FeedSort::Hot, Some(last)) => Some(encode_cursor(
            cursor_secret,
            &hot_score(last.score, last.created_at).to_string(),
            &last.uri,
        )),
    };

    Ok(FeedPage {
        posts: views,
        cursor: next_cursor,
    })
}

fn decode_sort_cursor(secret: &[u8], cursor: Option<&str>) -> AppResult<Option<String>> {
    let Some(cursor) = cursor else { return Ok(None) };
    let (sort_value, _uri) =
        decode_cursor(secret, cursor).map_err(|_| AppError::Validation("invalid cursor".to_string()))?;
    Ok(Some(sort_value))
}

fn decode_score_cursor(secret: &[u8], cursor: Option<&str>) -> AppResult<Option<(i64, String)>> {
    let Some(cursor) = cursor else { return Ok(None) };
    let (sort_value, uri) =
        decode_cursor(secret, cursor).map_err(|_| AppError::Validation("invalid cursor".to_string()))?;
    let score: i64 = sort_value
        .parse()
        .map_err(|_| AppError::Validation("invalid cursor".to_string()))?;
    Ok(Some((score, uri)))
}
