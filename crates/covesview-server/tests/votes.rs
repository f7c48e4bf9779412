use chrono::Utc;
use covesview_core::traits::RecordStore;
use covesview_core::types::{Post, User};
use covesview_test_utils::{assert_xrpc_ok, create_session_via_api, create_test_router_and_stores, send_request};

async fn seed_voter_and_post(stores: &covesview_test_utils::TestStores) -> (&'static str, String) {
    let did = "did:plc:voter";
    let data_server = "https://ds.test.local";
    stores
        .store
        .upsert_user(&User {
            did: did.to_string(),
            handle: "voter.test.local".to_string(),
            data_server: data_server.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let post_uri = "at://did:plc:author/app.coves.post/abc123".to_string();
    stores
        .store
        .upsert_post(&Post {
            uri: post_uri.clone(),
            cid: "bafypost".to_string(),
            rkey: "abc123".to_string(),
            author_did: "did:plc:author".to_string(),
            community_did: "did:plc:community".to_string(),
            title: "a post".to_string(),
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

    (did, post_uri)
}

#[tokio::test]
async fn toggle_vote_then_remove() {
    let (router, stores) = create_test_router_and_stores().await;
    let (did, post_uri) = seed_voter_and_post(&stores).await;
    let token = create_session_via_api(&router, did, "voter.test.local").await;

    let vote_body = serde_json::json!({
        "subject_uri": post_uri,
        "subject_cid": "bafypost",
        "direction": "up",
    });
    let (status, body) = send_request(&router, "POST", "/xrpc/app.coves.vote.create", Some(&token), Some(vote_body)).await;
    let body = assert_xrpc_ok(status, &body);
    assert!(body["uri"].is_string(), "expected a vote record uri: {body}");

    let remove_body = serde_json::json!({ "subject_uri": post_uri });
    let (status, body) =
        send_request(&router, "POST", "/xrpc/app.coves.vote.delete", Some(&token), Some(remove_body)).await;
    assert_xrpc_ok(status, &body);
}

#[tokio::test]
async fn vote_unknown_direction_400() {
    let (router, stores) = create_test_router_and_stores().await;
    let (did, post_uri) = seed_voter_and_post(&stores).await;
    let token = create_session_via_api(&router, did, "voter.test.local").await;

    let vote_body = serde_json::json!({
        "subject_uri": post_uri,
        "subject_cid": "bafypost",
        "direction": "sideways",
    });
    let (status, body) = send_request(&router, "POST", "/xrpc/app.coves.vote.create", Some(&token), Some(vote_body)).await;
    assert_eq!(status, 400, "expected a validation error for an unknown direction: {body}");
}
