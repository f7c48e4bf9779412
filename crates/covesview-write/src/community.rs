use chrono::Utc;
use covesview_core::collections::COMMUNITY_DECLARATION;
use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::{DataServerClient, RecordStore};
use covesview_core::types::StrongRef;
use serde_json::{Value, json};

use crate::embed::{ImageUpload, validate_image_upload};

pub struct CommunityUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<ImageUpload>,
    pub banner: Option<ImageUpload>,
}

/// Update a community's profile with `putRecord` + `swapCID`, uploading any
/// new avatar/banner blobs first so the updated record can reference their
/// CIDs directly.
pub async fn update_community(
    store: &dyn RecordStore,
    dataserver: &dyn DataServerClient,
    owner_did: &str,
    data_server: &str,
    access_token: &str,
    community_did: &str,
    rkey: &str,
    update: CommunityUpdate,
) -> AppResult<StrongRef> {
    let existing = store
        .get_community_by_did(community_did)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no community {community_did}")))?;

    if existing.owner_did != owner_did {
        return Err(AppError::Authorization(
            "only the owner may update this community".to_string(),
        ));
    }

    let avatar_blob = upload_optional(dataserver, data_server, access_token, update.avatar).await?;
    let banner_blob = upload_optional(dataserver, data_server, access_token, update.banner).await?;

    let display_name = update.display_name.unwrap_or_else(|| existing.display_name.clone());
    let description = update.description.or_else(|| existing.description.clone());
    let record = json!({
        "$type": COMMUNITY_DECLARATION,
        "name": existing.name.clone(),
        "displayName": display_name.clone(),
        "description": description.clone(),
        "visibility": existing.visibility.as_str(),
        "moderationType": existing.moderation_type.clone(),
        "externalDiscovery": existing.external_discovery,
        "avatar": avatar_blob,
        "banner": banner_blob,
        "createdAt": existing.created_at.to_rfc3339(),
    });

    let strong_ref = dataserver
        .put_record(
            data_server,
            access_token,
            community_did,
            COMMUNITY_DECLARATION,
            rkey,
            record,
            Some(&existing.record_cid),
        )
        .await?;

    let avatar_cid = blob_cid(&avatar_blob).or_else(|| existing.avatar_cid.clone());
    let banner_cid = blob_cid(&banner_blob).or_else(|| existing.banner_cid.clone());

    store
        .upsert_community(&covesview_core::types::Community {
            display_name,
            description,
            avatar_cid,
            banner_cid,
            record_cid: strong_ref.cid.clone(),
            updated_at: Utc::now(),
            ..existing
        })
        .await?;

    Ok(strong_ref)
}

fn blob_cid(blob: &Option<Value>) -> Option<String> {
    blob.as_ref()?
        .get("ref")?
        .get("$link")?
        .as_str()
        .map(|s| s.to_string())
}

async fn upload_optional(
    dataserver: &dyn DataServerClient,
    data_server: &str,
    access_token: &str,
    image: Option<ImageUpload>,
) -> AppResult<Option<Value>> {
    let Some(image) = image else { return Ok(None) };
    validate_image_upload(&image)?;
    let blob = dataserver
        .upload_blob(data_server, access_token, &image.mime_type, image.bytes)
        .await?;
    Ok(Some(blob))
}
