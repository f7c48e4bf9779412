use async_trait::async_trait;
use covesview_core::traits::DataServerClient;
use covesview_core::types::StrongRef;
use covesview_core::{AppError, AppResult};
use serde_json::{Value, json};

/// Calls an actor's own data server over XRPC. Writes are authenticated
/// with the actor's OAuth access token, obtained from the `SessionStore`
/// earlier in the request path; this client never holds or mints signing
/// material of its own.
#[derive(Clone)]
pub struct HttpDataServerClient {
    http: reqwest::Client,
}

impl Default for HttpDataServerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDataServerClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self { http }
    }

    fn xrpc_url(data_server: &str, method: &str) -> String {
        format!("{}/xrpc/{method}", data_server.trim_end_matches('/'))
    }
}

#[async_trait]
impl DataServerClient for HttpDataServerClient {
    async fn get_record(
        &self,
        data_server: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<Option<Value>> {
        let url = Self::xrpc_url(data_server, "com.atproto.repo.getRecord");
        let resp = self
            .http
            .get(&url)
            .query(&[("repo", did), ("collection", collection), ("rkey", rkey)])
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "getRecord failed with status {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        Ok(body.get("value").cloned())
    }

    async fn put_record(
        &self,
        data_server: &str,
        access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
        record: Value,
        swap_cid: Option<&str>,
    ) -> AppResult<StrongRef> {
        let url = Self::xrpc_url(data_server, "com.atproto.repo.putRecord");
        let mut body = json!({
            "repo": did,
            "collection": collection,
            "rkey": rkey,
            "record": record,
        });
        if let Some(cid) = swap_cid {
            body["swapRecord"] = json!(cid);
        }

        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            let reason = if swap_cid.is_some() {
                format!("concurrent modification at {collection}/{rkey}")
            } else {
                format!("record already exists at {collection}/{rkey}")
            };
            return Err(AppError::Conflict(reason));
        }
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Authentication(
                "data server rejected the session token".to_string(),
            ));
        }
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "putRecord failed with status {}",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        let uri = body
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Upstream("putRecord response missing uri".to_string()))?;
        let cid = body
            .get("cid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Upstream("putRecord response missing cid".to_string()))?;

        Ok(StrongRef {
            uri: uri.to_string(),
            cid: cid.to_string(),
        })
    }

    async fn delete_record(
        &self,
        data_server: &str,
        access_token: &str,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> AppResult<()> {
        let url = Self::xrpc_url(data_server, "com.atproto.repo.deleteRecord");
        let body = json!({
            "repo": did,
            "collection": collection,
            "rkey": rkey,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Authentication(
                "data server rejected the session token".to_string(),
            ));
        }
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::Upstream(format!(
                "deleteRecord failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn upload_blob(
        &self,
        data_server: &str,
        access_token: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Value> {
        let url = Self::xrpc_url(data_server, "com.atproto.repo.uploadBlob");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("content-type", mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Authentication(
                "data server rejected the session token".to_string(),
            ));
        }
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "uploadBlob failed with status {}",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        body.get("blob")
            .cloned()
            .ok_or_else(|| AppError::Upstream("uploadBlob response missing blob".to_string()))
    }
}
