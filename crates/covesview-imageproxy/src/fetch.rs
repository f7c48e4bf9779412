use std::time::Duration;

use crate::error::{ImageProxyError, ImageProxyResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_SOURCE_BYTES: u64 = 20 * 1024 * 1024;

/// Fetches a blob from an actor's data server over its blob-sync endpoint.
pub struct BlobFetcher {
    client: reqwest::Client,
}

impl Default for BlobFetcher {
    fn default() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
        }
    }
}

impl BlobFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch(&self, data_server: &str, did: &str, cid: &str) -> ImageProxyResult<Vec<u8>> {
        let url = format!("{data_server}/xrpc/com.atproto.sync.getBlob?did={did}&cid={cid}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ImageProxyError::Upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ImageProxyError::BlobNotFound);
        }
        if !response.status().is_success() {
            return Err(ImageProxyError::Upstream(format!(
                "data server returned {}",
                response.status()
            )));
        }
        if let Some(len) = response.content_length() {
            if len > MAX_SOURCE_BYTES {
                return Err(ImageProxyError::Upstream(format!(
                    "blob exceeds {MAX_SOURCE_BYTES} byte source limit"
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageProxyError::Upstream(e.to_string()))?;
        if bytes.len() as u64 > MAX_SOURCE_BYTES {
            return Err(ImageProxyError::Upstream(format!(
                "blob exceeds {MAX_SOURCE_BYTES} byte source limit"
            )));
        }
        Ok(bytes.to_vec())
    }
}
