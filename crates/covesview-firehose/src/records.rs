use serde::Deserialize;
use serde_json::json;

/// A blob reference as it appears inside a DAG-CBOR record: the blob's CID
/// travels as an IPLD link (CBOR tag 42), not as a `$link`-wrapped string,
/// so it deserializes straight into `Cid`.
#[derive(Debug, Deserialize)]
pub struct BlobRef {
    #[serde(rename = "ref")]
    pub cid: ipld_core::cid::Cid,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImageEmbedItem {
    pub alt: String,
    pub image: BlobRef,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "$type")]
pub enum EmbedWire {
    #[serde(rename = "app.coves.embed.images")]
    Images { images: Vec<ImageEmbedItem> },
}

impl EmbedWire {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EmbedWire::Images { images } => json!({
                "type": "images",
                "images": images.iter().map(|item| json!({
                    "alt": item.alt,
                    "cid": item.image.cid.to_string(),
                    "mimeType": item.image.mime_type,
                    "size": item.image.size,
                })).collect::<Vec<_>>(),
            }),
        }
    }
}

/// A strong reference as it appears on the wire: `{ uri, cid }` with both
/// fields plain strings (unlike a blob ref, this is not an IPLD link).
#[derive(Debug, Deserialize)]
pub struct StrongRefWire {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Deserialize)]
pub struct CommunityDeclarationWire {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    #[serde(rename = "moderationType")]
    pub moderation_type: Option<String>,
    #[serde(rename = "externalDiscovery")]
    pub external_discovery: Option<bool>,
    pub avatar: Option<BlobRef>,
    pub banner: Option<BlobRef>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct PostRecordWire {
    pub community: String,
    pub title: String,
    pub content: Option<String>,
    pub embed: Option<EmbedWire>,
    /// DID of the aggregator that composed this post on the community's
    /// behalf, if any. Absent for posts authored directly by a member.
    pub aggregator: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRecordWire {
    pub root: StrongRefWire,
    pub parent: Option<StrongRefWire>,
    pub content: String,
    pub embed: Option<EmbedWire>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRecordWire {
    pub subject: StrongRefWire,
    pub direction: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRecordWire {
    pub community: String,
    #[serde(rename = "contentVisibility")]
    pub content_visibility: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AggregatorDeclarationWire {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "sourceUrl")]
    pub source_url: Option<String>,
    #[serde(rename = "configSchema")]
    pub config_schema: Option<serde_json::Value>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AggregatorAuthorizationWire {
    pub aggregator: String,
    pub enabled: Option<bool>,
    pub config: Option<serde_json::Value>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}
