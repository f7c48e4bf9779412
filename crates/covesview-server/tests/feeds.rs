use chrono::Utc;
use covesview_core::traits::RecordStore;
use covesview_core::types::{Community, Post, Visibility};
use covesview_test_utils::{assert_xrpc_error, assert_xrpc_ok, create_test_router_and_stores, send_request};

#[tokio::test]
async fn feed_returns_posts_newest_first() {
    let (router, stores) = create_test_router_and_stores().await;
    let data_server = "https://ds.test.local";

    stores
        .store
        .upsert_community(&Community {
            did: "did:plc:community".to_string(),
            handle: "cats.test.local".to_string(),
            name: "cats".to_string(),
            display_name: "Cats".to_string(),
            description: None,
            owner_did: "did:plc:owner".to_string(),
            created_by_did: "did:plc:owner".to_string(),
            hosted_by_did: "did:plc:owner".to_string(),
            visibility: Visibility::Public,
            moderation_type: "open".to_string(),
            external_discovery: true,
            record_uri: "at://did:plc:community/app.coves.community.declaration/self".to_string(),
            record_cid: "bafyoriginal".to_string(),
            avatar_cid: None,
            banner_cid: None,
            subscriber_count: 0,
            member_count: 0,
            data_server: data_server.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    for (rkey, title) in [("aaa", "first post"), ("bbb", "second post")] {
        stores
            .store
            .upsert_post(&Post {
                uri: format!("at://did:plc:author/app.coves.post/{rkey}"),
                cid: format!("bafy{rkey}"),
                rkey: rkey.to_string(),
                author_did: "did:plc:author".to_string(),
                community_did: "did:plc:community".to_string(),
                title: title.to_string(),
                content: None,
                embed: None,
                upvote_count: 0,
                downvote_count: 0,
                comment_count: 0,
                score: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                indexed_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let (status, body) = send_request(
        &router,
        "GET",
        "/xrpc/app.coves.feed.get?community=did:plc:community&sort=new",
        None,
        None,
    )
    .await;
    let body = assert_xrpc_ok(status, &body);
    let posts = body["posts"].as_array().expect("posts array");
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn feed_unknown_sort_400() {
    let (router, _stores) = create_test_router_and_stores().await;
    let (status, body) = send_request(
        &router,
        "GET",
        "/xrpc/app.coves.feed.get?community=did:plc:community&sort=sideways",
        None,
        None,
    )
    .await;
    assert_xrpc_error(status, &body, 400, "InvalidRequest");
}
