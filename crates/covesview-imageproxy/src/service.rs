use std::sync::Arc;

use covesview_identity::IdentityResolver;

use crate::cache::{FsImageCache, etag_for};
use crate::cid::is_valid_cid;
use crate::error::{ImageProxyError, ImageProxyResult};
use crate::fetch::BlobFetcher;
use crate::presets::{self, Preset};
use crate::transform::transform;

/// Outcome of serving an image proxy request, already carrying the headers
/// a route handler needs to answer with.
pub enum ImageResponse {
    Ok { body: Vec<u8>, etag: String },
    NotModified { etag: String },
}

pub struct ImageProxyService {
    identity: Arc<IdentityResolver>,
    cache: FsImageCache,
    fetcher: BlobFetcher,
}

impl ImageProxyService {
    pub fn new(identity: Arc<IdentityResolver>, cache: FsImageCache) -> Self {
        Self {
            identity,
            cache,
            fetcher: BlobFetcher::new(),
        }
    }

    /// Serves `/img/<preset>/plain/<did>/<cid>` per the numbered flow: validate
    /// preset, validate CID syntax, resolve the did to a data server, check the
    /// cache, and on a miss fetch + decode + transform + cache the blob.
    pub async fn serve(
        &self,
        preset_name: &str,
        did: &str,
        cid: &str,
        if_none_match: Option<&str>,
    ) -> ImageProxyResult<ImageResponse> {
        let preset = presets::lookup(preset_name).ok_or(ImageProxyError::UnknownPreset)?;
        if !is_valid_cid(cid) {
            return Err(ImageProxyError::MalformedCid);
        }

        let etag = etag_for(preset.name, cid);
        if if_none_match == Some(etag.as_str()) {
            return Ok(ImageResponse::NotModified { etag });
        }

        if let Some(cached) = self.cache.get(preset.name, cid).await? {
            return Ok(ImageResponse::Ok { body: cached, etag });
        }

        let body = self.fetch_and_transform(preset, did, cid).await?;
        self.cache.put(preset.name, cid, &body).await?;
        Ok(ImageResponse::Ok { body, etag })
    }

    async fn fetch_and_transform(&self, preset: Preset, did: &str, cid: &str) -> ImageProxyResult<Vec<u8>> {
        let identity = self
            .identity
            .resolve_did(did)
            .await
            .map_err(|e| ImageProxyError::DidUnresolved(e.to_string()))?;

        let source = self.fetcher.fetch(&identity.data_server, did, cid).await?;
        transform(&source, preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covesview_core::traits::IdentityCacheStore;
    use covesview_core::types::Identity;

    struct NullIdentityCache;

    #[async_trait::async_trait]
    impl IdentityCacheStore for NullIdentityCache {
        async fn get(&self, _key: &str) -> covesview_core::error::AppResult<Option<Identity>> {
            Ok(None)
        }
        async fn put(&self, _key: &str, _identity: &Identity) -> covesview_core::error::AppResult<()> {
            Ok(())
        }
        async fn invalidate(&self, _key: &str) -> covesview_core::error::AppResult<()> {
            Ok(())
        }
    }

    fn service_with_unresolvable_identity(dir: &std::path::Path) -> ImageProxyService {
        let identity = Arc::new(IdentityResolver::new(
            Arc::new(NullIdentityCache),
            "https://plc.example.invalid".to_string(),
            3600,
        ));
        ImageProxyService::new(identity, FsImageCache::new(dir).unwrap())
    }

    #[tokio::test]
    async fn unknown_preset_is_rejected_before_any_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_unresolvable_identity(dir.path());
        let result = service.serve("not_a_preset", "did:plc:abc", "bafyabc", None).await;
        assert!(matches!(result, Err(ImageProxyError::UnknownPreset)));
    }

    #[tokio::test]
    async fn malformed_cid_is_rejected_before_identity_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_unresolvable_identity(dir.path());
        let result = service.serve("avatar", "did:plc:abc", "not-a-cid", None).await;
        assert!(matches!(result, Err(ImageProxyError::MalformedCid)));
    }

    #[tokio::test]
    async fn matching_if_none_match_short_circuits_to_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_unresolvable_identity(dir.path());
        let cid = "bafkreigh2akiscaildc4iexjwyexg5hxbpgmeqymzoyy7ml5jhrby6qtvu";
        let etag = etag_for("avatar", cid);
        let result = service.serve("avatar", "did:plc:abc", cid, Some(&etag)).await.unwrap();
        assert!(matches!(result, ImageResponse::NotModified { .. }));
    }

    #[tokio::test]
    async fn cache_hit_avoids_identity_resolution_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsImageCache::new(dir.path()).unwrap();
        let cid = "bafkreigh2akiscaildc4iexjwyexg5hxbpgmeqymzoyy7ml5jhrby6qtvu";
        cache.put("avatar", cid, b"cached-jpeg").await.unwrap();
        let identity = Arc::new(IdentityResolver::new(
            Arc::new(NullIdentityCache),
            "https://plc.example.invalid".to_string(),
            3600,
        ));
        let service = ImageProxyService::new(identity, cache);
        let result = service.serve("avatar", "did:plc:abc", cid, None).await.unwrap();
        match result {
            ImageResponse::Ok { body, .. } => assert_eq!(body, b"cached-jpeg"),
            ImageResponse::NotModified { .. } => panic!("expected a cache hit, not 304"),
        }
    }

    #[tokio::test]
    async fn unresolvable_did_surfaces_as_did_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_unresolvable_identity(dir.path());
        let cid = "bafkreigh2akiscaildc4iexjwyexg5hxbpgmeqymzoyy7ml5jhrby6qtvu";
        let result = service.serve("avatar", "did:example:nope", cid, None).await;
        assert!(matches!(result, Err(ImageProxyError::DidUnresolved(_))));
    }
}
