//! Comment tree assembly: a post's flat, indexed comment rows arranged into
//! a forest rooted at the post itself, paged and depth-clamped per request.

use covesview_core::error::AppResult;
use covesview_core::traits::RecordStore;
use covesview_core::types::{Comment, TopTimeframe};
use serde::Serialize;

use crate::ranking::hot_score;
use crate::viewer::{ViewerVote, viewer_vote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    New,
    Hot,
    Top(TopTimeframe),
}

impl CommentSort {
    pub fn parse(sort: &str, timeframe: Option<&str>) -> Option<Self> {
        match sort {
            "new" => Some(CommentSort::New),
            "hot" => Some(CommentSort::Hot),
            "top" => Some(CommentSort::Top(TopTimeframe::parse(timeframe.unwrap_or("all")))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub uri: String,
    pub cid: String,
    pub commenter_did: String,
    pub content: String,
    pub deleted: bool,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub reply_count: i64,
    pub score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub viewer: Option<ViewerVote>,
    pub has_more: bool,
    pub replies: Vec<CommentNode>,
}

/// Build the comment forest for `root_uri`.
///
/// `depth` is clamped to `0..=100`: depth 0 returns only top-level comments,
/// each carrying `has_more` when it has replies that were cut off. `limit`
/// bounds the number of top-level comments (`1..=100`); replies under a
/// shown comment are not independently paged.
pub async fn assemble_comment_tree(
    store: &dyn RecordStore,
    root_uri: &str,
    sort: CommentSort,
    viewer_did: Option<&str>,
    depth: u32,
    limit: usize,
) -> AppResult<Vec<CommentNode>> {
    let depth = depth.min(100);
    let limit = limit.clamp(1, 100);

    let mut all = store.list_comments_by_root(root_uri).await?;
    sort_comments(&mut all, sort);

    let top_level: Vec<Comment> = all
        .iter()
        .filter(|c| c.parent_uri == root_uri)
        .cloned()
        .take(limit)
        .collect();

    let mut nodes = Vec::with_capacity(top_level.len());
    for comment in top_level {
        nodes.push(build_node(store, &all, comment, sort, viewer_did, depth).await?);
    }
    Ok(nodes)
}

fn build_node<'a>(
    store: &'a dyn RecordStore,
    all: &'a [Comment],
    comment: Comment,
    sort: CommentSort,
    viewer_did: Option<&'a str>,
    remaining_depth: u32,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = AppResult<CommentNode>> + Send + 'a>> {
    Box::pin(async move {
        let children: Vec<Comment> = all.iter().filter(|c| c.parent_uri == comment.uri).cloned().collect();
        let viewer = viewer_vote(store, viewer_did, &comment.uri).await?;

        let (replies, has_more) = if remaining_depth == 0 {
            (Vec::new(), !children.is_empty())
        } else {
            let mut sorted_children = children;
            sort_comments(&mut sorted_children, sort);
            let mut replies = Vec::with_capacity(sorted_children.len());
            for child in sorted_children {
                replies.push(build_node(store, all, child, sort, viewer_did, remaining_depth - 1).await?);
            }
            (replies, false)
        };

        Ok(CommentNode {
            uri: comment.uri,
            cid: comment.cid,
            commenter_did: comment.commenter_did,
            content: comment.content,
            deleted: comment.deleted,
            upvote_count: comment.upvote_count,
            downvote_count: comment.downvote_count,
            reply_count: comment.reply_count,
            score: comment.score,
            created_at: comment.created_at,
            viewer,
            has_more,
            replies,
        })
    })
}

fn sort_comments(comments: &mut [Comment], sort: CommentSort) {
    match sort {
        CommentSort::New => comments.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        CommentSort::Top(timeframe) => {
            let since = timeframe.since(chrono::Utc::now());
            let in_range = |at: chrono::DateTime<chrono::Utc>| match since {
                Some(since) => at >= since,
                None => true,
            };
            comments.sort_by(|a, b| {
                in_range(b.created_at)
                    .cmp(&in_range(a.created_at))
                    .then_with(|| b.score.cmp(&a.score))
            });
        }
        CommentSort::Hot => comments.sort_by(|a, b| {
            hot_score(b.score, b.created_at)
                .partial_cmp(&hot_score(a.score, a.created_at))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}
