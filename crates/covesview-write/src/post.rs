use chrono::Utc;
use covesview_core::collections::POST;
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::{DataServerClient, RecordStore};
use covesview_core::types::{Post, StrongRef};
use covesview_crypto::TidGenerator;
use serde_json::json;

use crate::embed::{ImageUpload, validate_image_upload};

/// Who is performing the write, and under which repo's credentials. Users
/// write posts into their own repo; aggregators write into the community's
/// repo on the community's behalf, after passing authorization and rate
/// limiting (spec 4.6, 4.7).
pub enum Writer {
    User {
        did: String,
        access_token: String,
    },
    Aggregator {
        aggregator_did: String,
        access_token: String,
    },
}

pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub images: Vec<ImageUpload>,
}

pub async fn create_post(
    store: &dyn RecordStore,
    dataserver: &dyn DataServerClient,
    tid: &TidGenerator,
    writer: Writer,
    community_did: &str,
    new_post: NewPost,
) -> AppResult<StrongRef> {
    for image in &new_post.images {
        validate_image_upload(image)?;
    }

    let community = store
        .get_community_by_did(community_did)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no community {community_did}")))?;

    let (repo_did, data_server, access_token, aggregator_did) = match &writer {
        Writer::User { did, access_token } => {
            let identity_data_server = store
                .get_user_by_did(did)
                .await?
                .map(|u| u.data_server)
                .ok_or_else(|| AppError::NotFound(format!("no user {did}")))?;
            (did.clone(), identity_data_server, access_token.clone(), None)
        }
        Writer::Aggregator {
            aggregator_did,
            access_token,
        } => {
            covesview_aggregator::authorize_post(store, aggregator_did, community_did).await?;
            (
                community_did.to_string(),
                community.data_server.clone(),
                access_token.clone(),
                Some(aggregator_did.clone()),
            )
        }
    };

    let mut embed_images = Vec::with_capacity(new_post.images.len());
    for image in &new_post.images {
        let blob = dataserver
            .upload_blob(&data_server, &access_token, &image.mime_type, image.bytes.clone())
            .await?;
        embed_images.push(json!({ "alt": image.alt, "image": blob }));
    }
    let embed = if embed_images.is_empty() {
        None
    } else {
        Some(json!({ "$type": "app.coves.embed.images", "images": embed_images }))
    };

    let rkey = tid.next_tid();
    let created_at = Utc::now();
    let NewPost { title, content, .. } = new_post;
    let mut record = json!({
        "$type": POST,
        "community": community_did,
        "title": title.clone(),
        "content": content.clone(),
        "embed": embed,
        "createdAt": created_at.to_rfc3339(),
    });
    if let Some(ref aggregator_did) = aggregator_did {
        record["aggregator"] = json!(aggregator_did);
    }

    let strong_ref = dataserver
        .put_record(&data_server, &access_token, &repo_did, POST, &rkey, record, None)
        .await?;

    // Read-after-write: index immediately so the post shows up before the
    // firehose delivers the same commit back to us. The consumer's upsert
    // is idempotent on this uri, so re-indexing from the firehose is a no-op.
    store
        .upsert_post(&Post {
            uri: strong_ref.uri.clone(),
            cid: strong_ref.cid.clone(),
            rkey,
            author_did: repo_did,
            community_did: community_did.to_string(),
            title,
            content,
            embed: None,
            upvote_count: 0,
            downvote_count: 0,
            comment_count: 0,
            score: 0,
            created_at,
            updated_at: created_at,
            indexed_at: created_at,
        })
        .await?;

    if let Some(aggregator_did) = aggregator_did {
        covesview_aggregator::record_post(store, &aggregator_did, community_did, &strong_ref.uri).await?;
    }

    Ok(strong_ref)
}
