use std::sync::Arc;

use covesview_core::{AppError, AppResult};
use covesview_core::traits::IdentityCacheStore;
use covesview_core::types::{Identity, ResolutionMethod};

/// Cap on the body read from an actor's `.well-known/atproto-did` response,
/// so a misbehaving or hostile host can't feed us an unbounded stream.
const HTTPS_RESPONSE_CAP_BYTES: usize = 1024;

pub struct IdentityResolver {
    cache: Arc<dyn IdentityCacheStore>,
    plc_directory_url: String,
    cache_ttl_secs: i64,
    http: reqwest::Client,
}

impl IdentityResolver {
    pub fn new(
        cache: Arc<dyn IdentityCacheStore>,
        plc_directory_url: impl Into<String>,
        cache_ttl_secs: i64,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self {
            cache,
            plc_directory_url: plc_directory_url.into(),
            cache_ttl_secs,
            http,
        }
    }

    /// Resolve a handle to a full [`Identity`], consulting and populating
    /// the cache. DNS is tried first; HTTPS is the fallback.
    pub async fn resolve_handle(&self, handle: &str) -> AppResult<Identity> {
        if let Some(cached) = self.cached_fresh(handle).await? {
            return Ok(cached);
        }

        let did = match self.resolve_handle_dns(handle).await {
            Ok(Some(did)) => did,
            Ok(None) => match self.resolve_handle_https(handle).await {
                Ok(Some(did)) => did,
                Ok(None) => {
                    return Err(AppError::NotFound(format!(
                        "no did found for handle {handle}"
                    )));
                }
                Err(e) => {
                    tracing::debug!("https handle resolution failed for {handle}: {e}");
                    return Err(e);
                }
            },
            Err(e) => {
                tracing::debug!("dns handle resolution failed for {handle}: {e}");
                return Err(e);
            }
        };

        let identity = self.resolve_did_document(&did, handle.to_string()).await?;
        self.cache.put(handle, &identity).await?;
        self.cache.put(&did, &identity).await?;
        Ok(identity)
    }

    /// Resolve a DID to a full [`Identity`], consulting and populating the
    /// cache. The handle is read back out of the DID document's
    /// `alsoKnownAs` entry.
    pub async fn resolve_did(&self, did: &str) -> AppResult<Identity> {
        if let Some(cached) = self.cached_fresh(did).await? {
            return Ok(cached);
        }

        let doc = self.fetch_did_document(did).await?;
        let handle = extract_handle(&doc).unwrap_or_default();
        let identity = self.identity_from_document(did, handle.clone(), doc)?;
        self.cache.put(did, &identity).await?;
        if !handle.is_empty() {
            self.cache.put(&handle, &identity).await?;
        }
        Ok(identity)
    }

    pub async fn invalidate(&self, key: &str) -> AppResult<()> {
        self.cache.invalidate(key).await
    }

    async fn cached_fresh(&self, key: &str) -> AppResult<Option<Identity>> {
        let Some(identity) = self.cache.get(key).await? else {
            return Ok(None);
        };
        let age = chrono::Utc::now() - identity.resolved_at;
        if age.num_seconds() > self.cache_ttl_secs {
            return Ok(None);
        }
        Ok(Some(Identity {
            method: ResolutionMethod::Cache,
            ..identity
        }))
    }

    async fn resolve_did_document(&self, did: &str, handle: String) -> AppResult<Identity> {
        let doc = self.fetch_did_document(did).await?;
        self.identity_from_document(did, handle, doc)
    }

    fn identity_from_document(
        &self,
        did: &str,
        handle: String,
        doc: serde_json::Value,
    ) -> AppResult<Identity> {
        let data_server = extract_pds_endpoint(&doc).ok_or_else(|| {
            AppError::Upstream(format!("did document for {did} has no pds service entry"))
        })?;
        Ok(Identity {
            did: did.to_string(),
            handle,
            data_server,
            resolved_at: chrono::Utc::now(),
            method: ResolutionMethod::Https,
        })
    }

    async fn fetch_did_document(&self, did: &str) -> AppResult<serde_json::Value> {
        let url = if let Some(plc_id) = did.strip_prefix("did:plc:") {
            if plc_id.is_empty() {
                return Err(AppError::Validation("empty did:plc identifier".into()));
            }
            format!("{}/{did}", self.plc_directory_url.trim_end_matches('/'))
        } else if let Some(domain) = did.strip_prefix("did:web:") {
            if domain.is_empty() {
                return Err(AppError::Validation("empty did:web identifier".into()));
            }
            format!("https://{domain}/.well-known/did.json")
        } else {
            return Err(AppError::Validation(format!("unsupported did method: {did}")));
        };

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::NotFound(format!("did document not found for {did}")));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))
    }

    async fn resolve_handle_dns(&self, handle: &str) -> AppResult<Option<String>> {
        use hickory_resolver::Resolver;

        let resolver = Resolver::builder_tokio()
            .map_err(|e| AppError::Internal(format!("dns resolver init failed: {e}")))?
            .build();

        let lookup_name = format!("_atproto.{handle}.");
        let txt_lookup = match resolver.txt_lookup(&lookup_name).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::debug!("dns txt lookup failed for {handle}: {e}");
                return Ok(None);
            }
        };

        for record in txt_lookup {
            let txt = record.to_string();
            if let Some(did) = txt.strip_prefix("did=") {
                let did = did.trim();
                if did.starts_with("did:") {
                    return Ok(Some(did.to_string()));
                }
            }
        }

        Ok(None)
    }

    async fn resolve_handle_https(&self, handle: &str) -> AppResult<Option<String>> {
        let url = format!("https://{handle}/.well-known/atproto-did");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        let truncated = &bytes[..bytes.len().min(HTTPS_RESPONSE_CAP_BYTES)];
        let body = String::from_utf8_lossy(truncated);
        let did = body.trim();

        if did.starts_with("did:") {
            Ok(Some(did.to_string()))
        } else {
            Ok(None)
        }
    }
}

fn extract_handle(doc: &serde_json::Value) -> Option<String> {
    doc.get("alsoKnownAs")?
        .as_array()?
        .iter()
        .find_map(|v| v.as_str())
        .and_then(|s| s.strip_prefix("at://"))
        .map(|s| s.to_string())
}

fn extract_pds_endpoint(doc: &serde_json::Value) -> Option<String> {
    doc.get("service")?.as_array()?.iter().find_map(|svc| {
        let ty = svc.get("type")?.as_str()?;
        if ty != "AtprotoPersonalDataServer" {
            return None;
        }
        svc.get("serviceEndpoint")?.as_str().map(|s| s.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_handle_strips_at_prefix() {
        let doc = serde_json::json!({
            "alsoKnownAs": ["at://alice.example.com"]
        });
        assert_eq!(extract_handle(&doc).as_deref(), Some("alice.example.com"));
    }

    #[test]
    fn extract_handle_missing_returns_none() {
        let doc = serde_json::json!({});
        assert_eq!(extract_handle(&doc), None);
    }

    #[test]
    fn extract_pds_endpoint_finds_matching_service() {
        let doc = serde_json::json!({
            "service": [
                {"type": "SomeOtherService", "serviceEndpoint": "https://other.example.com"},
                {"type": "AtprotoPersonalDataServer", "serviceEndpoint": "https://pds.example.com"}
            ]
        });
        assert_eq!(
            extract_pds_endpoint(&doc).as_deref(),
            Some("https://pds.example.com")
        );
    }

    #[test]
    fn extract_pds_endpoint_missing_returns_none() {
        let doc = serde_json::json!({"service": []});
        assert_eq!(extract_pds_endpoint(&doc), None);
    }
}
