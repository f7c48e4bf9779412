use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use covesview_core::config::{
    AppConfig, DatabaseConfig, FirehoseConfig, IdentityConfig, ImageProxyConfig, SessionConfig,
};
use covesview_crypto::TidGenerator;
use covesview_identity::IdentityResolver;
use covesview_imageproxy::{FsImageCache, ImageProxyService};
use covesview_server::{AppState, build_router};
use covesview_storage_sqlite::store::SqliteStore;
use covesview_write::vote::VoteCache;

use crate::stores::{FakeDataServer, TestStores};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-chars-long";
pub const TEST_CURSOR_SECRET: &str = "test-cursor-secret-at-least-32-chars-long";

pub fn create_test_config(stores: &TestStores) -> AppConfig {
    AppConfig {
        hostname: "appview.test.local".to_string(),
        port: 0,
        public_url: "https://appview.test.local".to_string(),
        database: DatabaseConfig { url: String::new() },
        instance_did: "did:web:appview.test.local".to_string(),
        instance_domain: "test.local".to_string(),
        identity: IdentityConfig {
            plc_directory_url: "https://plc.directory".to_string(),
            cache_ttl_secs: 3600,
        },
        firehose: FirehoseConfig {
            relay_url: "wss://relay.test.local/xrpc/com.atproto.sync.subscribeRepos".to_string(),
            backoff_cap_secs: 60,
        },
        session: SessionConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            cursor_secret: TEST_CURSOR_SECRET.to_string(),
            session_ttl_secs: 3600,
        },
        image_proxy: ImageProxyConfig {
            cache_path: stores.image_cache_path.to_string_lossy().into_owned(),
            cache_max_bytes: 1_000_000_000,
        },
    }
}

pub fn create_test_app_state(stores: &TestStores) -> AppState<SqliteStore, SqliteStore> {
    let config = create_test_config(stores);
    let identity_cache = Arc::new(stores.store.clone());
    let identity = Arc::new(IdentityResolver::new(
        identity_cache,
        config.identity.plc_directory_url.clone(),
        config.identity.cache_ttl_secs,
    ));
    let image_cache =
        FsImageCache::new(stores.image_cache_path.clone()).expect("failed to create image cache");

    AppState {
        store: Arc::new(stores.store.clone()),
        sessions: Arc::new(stores.store.clone()),
        dataserver: Arc::new(FakeDataServer::default()),
        identity: identity.clone(),
        image_proxy: Arc::new(ImageProxyService::new(identity, image_cache)),
        tid: Arc::new(TidGenerator::new()),
        votes: Arc::new(VoteCache::new()),
        config: Arc::new(config),
    }
}

pub fn create_test_router(stores: &TestStores) -> Router {
    let state = create_test_app_state(stores);
    build_router(state)
}

pub async fn create_test_router_and_stores() -> (Router, TestStores) {
    let stores = crate::stores::create_test_stores().await;
    let router = create_test_router(&stores);
    (router, stores)
}

/// Exchange an externally-issued OAuth access token for a covesview session
/// JWT via `app.coves.session.create`, returning the JWT.
pub async fn create_session_via_api(router: &Router, did: &str, handle: &str) -> String {
    let body = serde_json::json!({
        "did": did,
        "handle": handle,
        "access_token": format!("fake-access-token-for-{did}"),
    });

    let (status, json) = send_request(router, "POST", "/xrpc/app.coves.session.create", None, Some(body)).await;
    assert_eq!(status, 200, "session.create failed: {json}");
    json["token"].as_str().expect("session.create response missing token").to_string()
}

/// Send a request through the router and return (status, body_json).
pub async fn send_request(
    router: &Router,
    method: &str,
    uri: &str,
    auth_token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let req_body = match body {
        Some(b) => Body::from(serde_json::to_vec(&b).unwrap()),
        None => Body::empty(),
    };

    let req = builder.body(req_body).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status().as_u16();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}
