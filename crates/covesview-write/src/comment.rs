use chrono::Utc;
use covesview_core::collections::COMMENT;
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::{DataServerClient, RecordStore};
use covesview_core::types::{Comment, StrongRef};
use covesview_crypto::TidGenerator;
use serde_json::json;

pub struct NewComment {
    pub root: StrongRef,
    pub parent: Option<StrongRef>,
    pub content: String,
}

pub async fn create_comment(
    store: &dyn RecordStore,
    dataserver: &dyn DataServerClient,
    tid: &TidGenerator,
    commenter_did: &str,
    data_server: &str,
    access_token: &str,
    new_comment: NewComment,
) -> AppResult<StrongRef> {
    let rkey = tid.next_tid();
    let created_at = Utc::now();
    let parent = new_comment.parent.clone().unwrap_or_else(|| new_comment.root.clone());

    let record = json!({
        "$type": COMMENT,
        "root": { "uri": new_comment.root.uri.clone(), "cid": new_comment.root.cid.clone() },
        "parent": { "uri": parent.uri.clone(), "cid": parent.cid.clone() },
        "content": new_comment.content.clone(),
        "createdAt": created_at.to_rfc3339(),
    });

    let strong_ref = dataserver
        .put_record(data_server, access_token, commenter_did, COMMENT, &rkey, record, None)
        .await?;

    let root_uri = new_comment.root.uri.clone();
    let is_reply_to_comment = parent.uri != root_uri;

    store
        .upsert_comment(&Comment {
            uri: strong_ref.uri.clone(),
            cid: strong_ref.cid.clone(),
            commenter_did: commenter_did.to_string(),
            root_uri: new_comment.root.uri,
            root_cid: new_comment.root.cid,
            parent_uri: parent.uri.clone(),
            parent_cid: parent.cid,
            content: new_comment.content,
            embed: None,
            upvote_count: 0,
            downvote_count: 0,
            reply_count: 0,
            score: 0,
            deleted: false,
            created_at,
            updated_at: created_at,
        })
        .await?;

    store.adjust_post_comment_count(&root_uri, 1).await?;
    if is_reply_to_comment {
        store.adjust_comment_reply_count(&parent.uri, 1).await?;
    }

    Ok(strong_ref)
}

fn record_rkey(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// Update a comment's content via `putRecord` with `swapCID` set to the
/// currently indexed CID, so a racing concurrent edit surfaces as a
/// conflict instead of silently clobbering it.
pub async fn update_comment(
    store: &dyn RecordStore,
    dataserver: &dyn DataServerClient,
    editor_did: &str,
    data_server: &str,
    access_token: &str,
    comment_uri: &str,
    new_content: String,
) -> AppResult<StrongRef> {
    let existing = store
        .get_comment_by_uri(comment_uri)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no comment {comment_uri}")))?;

    if existing.commenter_did != editor_did {
        return Err(AppError::Authorization(
            "only the commenter may update this comment".to_string(),
        ));
    }

    let record = json!({
        "$type": COMMENT,
        "root": { "uri": existing.root_uri, "cid": existing.root_cid },
        "parent": { "uri": existing.parent_uri, "cid": existing.parent_cid },
        "content": new_content,
        "createdAt": existing.created_at.to_rfc3339(),
    });

    let strong_ref = dataserver
        .put_record(
            data_server,
            access_token,
            editor_did,
            COMMENT,
            record_rkey(comment_uri),
            record,
            Some(&existing.cid),
        )
        .await?;

    store
        .upsert_comment(&Comment {
            content: new_content,
            cid: strong_ref.cid.clone(),
            updated_at: Utc::now(),
            ..existing
        })
        .await?;

    Ok(strong_ref)
}

pub async fn delete_comment(
    store: &dyn RecordStore,
    dataserver: &dyn DataServerClient,
    editor_did: &str,
    data_server: &str,
    access_token: &str,
    comment_uri: &str,
) -> AppResult<()> {
    let existing = store
        .get_comment_by_uri(comment_uri)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no comment {comment_uri}")))?;

    if existing.commenter_did != editor_did {
        return Err(AppError::Authorization(
            "only the commenter may delete this comment".to_string(),
        ));
    }

    dataserver
        .delete_record(data_server, access_token, editor_did, COMMENT, record_rkey(comment_uri))
        .await?;
    store.mark_comment_deleted(comment_uri).await
}
