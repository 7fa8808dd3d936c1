// ABOUTME: Integration tests for conversation list, deletion and unread totals
// ABOUTME: Verifies projection ordering and the delete cascade over direct messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;
mod helpers;

use helpers::axum_test::AxumTestRequest;
use parley_server::server::build_router;
use serde_json::{json, Value};

async fn send(app: &axum::Router, from: &str, to: &str, text: &str) {
    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": from,
            "receiverAccount": to,
            "message": text
        }))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_list_orders_by_most_recent_message() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    send(&app, "alice", "bob", "first thread").await;
    send(&app, "alice", "carol", "second thread").await;

    let body: Value = AxumTestRequest::get("/api/conversations/alice")
        .send(app.clone())
        .await
        .json();
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0]["contactAccount"], "carol");
    assert_eq!(conversations[1]["contactAccount"], "bob");

    // A newer message in the older thread reorders the list
    send(&app, "alice", "bob", "bump").await;
    let body: Value = AxumTestRequest::get("/api/conversations/alice")
        .send(app)
        .await
        .json();
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations[0]["contactAccount"], "bob");
    assert_eq!(conversations[0]["lastMessage"], "bump");
}

#[tokio::test]
async fn test_long_preview_truncated_but_message_intact() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let long_message = "m".repeat(400);
    send(&app, "alice", "bob", &long_message).await;

    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app.clone())
        .await
        .json();
    let preview = body["conversations"][0]["lastMessage"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 100);

    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app)
        .await
        .json();
    assert_eq!(
        body["messages"][0]["message"].as_str().unwrap().len(),
        400
    );
}

#[tokio::test]
async fn test_delete_removes_own_projection_and_thread() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    send(&app, "alice", "bob", "hello").await;
    send(&app, "bob", "alice", "hi back").await;

    let response = AxumTestRequest::delete(
        "/api/conversations?userAccount=alice&contactAccount=bob",
    )
    .send(app.clone())
    .await;
    assert_eq!(response.status(), 200);

    let body: Value = AxumTestRequest::get("/api/conversations/alice")
        .send(app.clone())
        .await
        .json();
    assert!(body["conversations"].as_array().unwrap().is_empty());

    // The underlying messages are gone in both directions
    let body: Value = AxumTestRequest::get("/api/messages?account1=alice&account2=bob")
        .send(app)
        .await
        .json();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_requires_both_accounts() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let response = AxumTestRequest::delete("/api/conversations?userAccount=alice")
        .send(app)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "MISSING_REQUIRED_FIELD");
}

#[tokio::test]
async fn test_unread_total_sums_across_contacts() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    send(&app, "alice", "bob", "one").await;
    send(&app, "alice", "bob", "two").await;
    send(&app, "carol", "bob", "three").await;

    let body: Value = AxumTestRequest::get("/api/conversations/unread/count/bob")
        .send(app.clone())
        .await
        .json();
    assert_eq!(body["count"], 3);

    // Reading one thread only reduces that thread's share
    AxumTestRequest::put("/api/messages/read")
        .json(&json!({"userAccount": "bob", "contactAccount": "alice"}))
        .send(app.clone())
        .await;

    let body: Value = AxumTestRequest::get("/api/conversations/unread/count/bob")
        .send(app)
        .await
        .json();
    assert_eq!(body["count"], 1);
}
