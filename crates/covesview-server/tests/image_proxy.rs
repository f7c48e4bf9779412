use covesview_test_utils::{create_test_router_and_stores, send_request};

#[tokio::test]
async fn unknown_preset_400() {
    let (router, _stores) = create_test_router_and_stores().await;
    let (status, _body) = send_request(
        &router,
        "GET",
        "/img/nonexistent/plain/did:plc:someone/bafyabc",
        None,
        None,
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn malformed_cid_400() {
    let (router, _stores) = create_test_router_and_stores().await;
    let (status, _body) = send_request(
        &router,
        "GET",
        "/img/avatar/plain/did:plc:someone/not-a-cid",
        None,
        None,
    )
    .await;
    assert_eq!(status, 400);
}
