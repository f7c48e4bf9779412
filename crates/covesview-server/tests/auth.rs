use covesview_test_utils::{assert_xrpc_error, create_session_via_api, create_test_router_and_stores, send_request};

#[tokio::test]
async fn missing_auth_header_401() {
    let (router, _stores) = create_test_router_and_stores().await;
    let body = serde_json::json!({"community": "test", "title": "hi"});
    let (status, body) = send_request(&router, "POST", "/xrpc/app.coves.post.create", None, Some(body)).await;
    assert_xrpc_error(status, &body, 401, "AuthenticationRequired");
}

#[tokio::test]
async fn invalid_bearer_401() {
    let (router, _stores) = create_test_router_and_stores().await;
    let body = serde_json::json!({"community": "test", "title": "hi"});
    let (status, body) = send_request(
        &router,
        "POST",
        "/xrpc/app.coves.post.create",
        Some("not-a-real-token"),
        Some(body),
    )
    .await;
    assert_xrpc_error(status, &body, 401, "InvalidToken");
}

#[tokio::test]
async fn valid_token_reaches_handler() {
    let (router, _stores) = create_test_router_and_stores().await;
    let token = create_session_via_api(&router, "did:plc:alice", "alice.test.local").await;

    // No indexed user record yet, so the handler is reached and fails with a
    // domain NotFound rather than an auth rejection.
    let body = serde_json::json!({"community": "nonexistent", "title": "hi"});
    let (status, body) = send_request(&router, "POST", "/xrpc/app.coves.post.create", Some(&token), Some(body)).await;
    assert_eq!(status, 404, "expected a domain error once past auth: {body}");
}
