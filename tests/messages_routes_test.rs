// ABOUTME: Integration tests for direct message routes and conversation projections
// ABOUTME: Exercises sends, read-state, replies, image uploads and validation failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;
mod helpers;

use helpers::axum_test::{AxumTestRequest, MultipartForm};
use parley_server::server::build_router;
use parley_server::storage::MemoryBlobStore;
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_send_text_updates_both_projections() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "alice",
            "receiverAccount": "bob",
            "message": "hello bob"
        }))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["messageId"].as_str().unwrap().starts_with("msg_"));

    // Sender's projection: preview updated, no unread
    let body: Value = AxumTestRequest::get("/api/conversations/alice")
        .send(app.clone())
        .await
        .json();
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["contactAccount"], "bob");
    assert_eq!(conversations[0]["lastMessage"], "hello bob");
    assert_eq!(conversations[0]["unreadCount"], 0);

    // Receiver's projection: same preview, one unread, contact name joined
    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app)
        .await
        .json();
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["contactAccount"], "alice");
    assert_eq!(conversations[0]["contactName"], "Alice Chen");
    assert_eq!(conversations[0]["lastMessage"], "hello bob");
    assert_eq!(conversations[0]["unreadCount"], 1);
}

#[tokio::test]
async fn test_unread_accumulates_then_thread_fetch_clears_it() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    for text in ["one", "two", "three"] {
        let response = AxumTestRequest::post("/api/messages/send")
            .json(&json!({
                "senderAccount": "alice",
                "receiverAccount": "bob",
                "message": text
            }))
            .send(app.clone())
            .await;
        assert_eq!(response.status(), 200);
    }

    let body: Value = AxumTestRequest::get("/api/conversations/unread/count/bob")
        .send(app.clone())
        .await
        .json();
    assert_eq!(body["count"], 3);

    // Fetching the thread as bob marks alice's messages read
    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app.clone())
        .await
        .json();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    // Chronological order
    assert_eq!(messages[0]["message"], "one");
    assert_eq!(messages[1]["message"], "two");
    assert_eq!(messages[2]["message"], "three");

    let body: Value = AxumTestRequest::get("/api/conversations/unread/count/bob")
        .send(app.clone())
        .await
        .json();
    assert_eq!(body["count"], 0);

    // Second fetch sees the read flags
    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app)
        .await
        .json();
    for message in body["messages"].as_array().unwrap() {
        assert_eq!(message["isRead"], true);
        assert!(message["readAt"].is_string());
    }
}

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "alice",
            "receiverAccount": "bob",
            "message": "ping"
        }))
        .send(app.clone())
        .await;

    for _ in 0..2 {
        let response = AxumTestRequest::put("/api/messages/read")
            .json(&json!({"userAccount": "bob", "contactAccount": "alice"}))
            .send(app.clone())
            .await;
        assert_eq!(response.status(), 200);
    }

    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app)
        .await
        .json();
    assert_eq!(body["conversations"][0]["unreadCount"], 0);
}

#[tokio::test]
async fn test_reply_carries_context_and_survives_original_deletion() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources.clone());

    let body: Value = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "alice",
            "receiverAccount": "bob",
            "message": "original question"
        }))
        .send(app.clone())
        .await
        .json();
    let original_id = body["messageId"].as_str().unwrap().to_owned();

    AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "bob",
            "receiverAccount": "alice",
            "message": "an answer",
            "messageType": "reply",
            "replyToMessageId": original_id
        }))
        .send(app.clone())
        .await;

    let body: Value = AxumTestRequest::get("/api/messages?account1=alice&account2=bob")
        .send(app.clone())
        .await
        .json();
    let reply = &body["messages"].as_array().unwrap()[1];
    assert_eq!(reply["replyToMessage"], "original question");
    assert_eq!(reply["replyToSender"], "alice");
    assert_eq!(reply["replyToSenderName"], "Alice Chen");

    // Deleting the original leaves the reply with null context
    sqlx::query("DELETE FROM messages WHERE message_id = $1")
        .bind(&original_id)
        .execute(resources.database.pool())
        .await
        .unwrap();

    let body: Value = AxumTestRequest::get("/api/messages?account1=alice&account2=bob")
        .send(app)
        .await
        .json();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["replyToMessageId"], original_id.as_str());
    assert!(messages[0]["replyToMessage"].is_null());
    assert!(messages[0]["replyToSenderName"].is_null());
}

#[tokio::test]
async fn test_send_validation_failures() {
    let (resources, _store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    // Missing sender
    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({"receiverAccount": "bob", "message": "hi"}))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "MISSING_REQUIRED_FIELD");

    // Empty message
    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "alice",
            "receiverAccount": "bob",
            "message": ""
        }))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 400);

    // Message over 5000 characters
    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "alice",
            "receiverAccount": "bob",
            "message": "x".repeat(5001)
        }))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");

    // Account over 50 characters
    let response = AxumTestRequest::post("/api/messages/send")
        .json(&json!({
            "senderAccount": "a".repeat(51),
            "receiverAccount": "bob",
            "message": "hi"
        }))
        .send(app)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_send_image_uploads_then_records() {
    let (resources, store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let form = MultipartForm::new()
        .text("senderAccount", "alice")
        .text("receiverAccount", "bob")
        .file("image", "photo.gif", "image/gif", common::TINY_GIF);
    let response = AxumTestRequest::post("/api/messages/send-image")
        .multipart(form)
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert!(body["imageUrl"].as_str().unwrap().starts_with("memory://"));
    assert_eq!(store.len(), 1);

    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app.clone())
        .await
        .json();
    let message = &body["messages"].as_array().unwrap()[0];
    assert_eq!(message["messageType"], "image");
    assert_eq!(message["message"], "");
    assert!(message["imageUrl"].as_str().unwrap().starts_with("memory://"));

    // Projection preview is the fixed image placeholder
    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app)
        .await
        .json();
    assert_eq!(body["conversations"][0]["lastMessage"], "sent an image");
}

#[tokio::test]
async fn test_send_multi_images_creates_child_rows() {
    let (resources, store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let form = MultipartForm::new()
        .text("senderAccount", "alice")
        .text("receiverAccount", "bob")
        .file("images", "a.png", "image/png", common::TINY_GIF)
        .file("images", "b.png", "image/png", common::TINY_GIF)
        .file("images", "c.png", "image/png", common::TINY_GIF);
    let response = AxumTestRequest::post("/api/messages/send-multi-images")
        .multipart(form)
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["imageCount"], 3);
    assert_eq!(body["imageUrls"].as_array().unwrap().len(), 3);
    assert_eq!(store.len(), 3);
    let message_id = body["messageId"].as_str().unwrap().to_owned();

    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app.clone())
        .await
        .json();
    let message = &body["messages"].as_array().unwrap()[0];
    assert_eq!(message["messageType"], "multi_image");
    assert_eq!(message["imageCount"], 3);
    let images = message["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0]["imageOrder"], 0);
    assert_eq!(images[2]["imageOrder"], 2);

    // Captionless batch falls back to the count preview
    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app.clone())
        .await
        .json();
    assert_eq!(body["conversations"][0]["lastMessage"], "[3 images]");

    let body: Value =
        AxumTestRequest::get(&format!("/api/messages/{message_id}/images"))
            .send(app)
            .await
            .json();
    assert_eq!(body["images"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_partial_upload_failure_aborts_before_database() {
    let store = Arc::new(MemoryBlobStore::failing_after(1));
    let (resources, store) = common::create_test_resources_with_store(store)
        .await
        .unwrap();
    let app = build_router(resources);

    let form = MultipartForm::new()
        .text("senderAccount", "alice")
        .text("receiverAccount", "bob")
        .file("images", "a.png", "image/png", common::TINY_GIF)
        .file("images", "b.png", "image/png", common::TINY_GIF);
    let response = AxumTestRequest::post("/api/messages/send-multi-images")
        .multipart(form)
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json();
    assert_eq!(body["error"], "UPLOAD_FAILED");
    // First blob may have landed, but nothing reached the database
    assert!(store.len() <= 1);

    let body: Value = AxumTestRequest::get("/api/messages?account1=bob&account2=alice")
        .send(app.clone())
        .await
        .json();
    assert!(body["messages"].as_array().unwrap().is_empty());

    let body: Value = AxumTestRequest::get("/api/conversations/bob")
        .send(app)
        .await
        .json();
    assert!(body["conversations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_image_upload_rejected() {
    let (resources, store) = common::create_test_resources().await.unwrap();
    let app = build_router(resources);

    let form = MultipartForm::new()
        .text("senderAccount", "alice")
        .text("receiverAccount", "bob")
        .file("image", "notes.pdf", "application/pdf", b"%PDF-1.4");
    let response = AxumTestRequest::post("/api/messages/send-image")
        .multipart(form)
        .send(app)
        .await;
    assert_eq!(response.status(), 400);
    assert!(store.is_empty());
}
