// ABOUTME: Group message endpoints - thread retrieval, sends with fan-out, read marking
// ABOUTME: Shares the multipart image form handling with the direct message routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group message routes
//!
//! Sends fan out to every member's conversation projection inside the data
//! layer transaction. Image uploads complete before any database write.

use crate::errors::AppError;
use crate::models::{message_types, ThreadMessage};
use crate::routes::messages::collect_image_form;
use crate::routes::{require_field, validate_account, validate_message};
use crate::server::ServerResources;
use crate::storage::{self, MAX_IMAGES_PER_MESSAGE, MAX_IMAGE_BYTES};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Multipart request body limit: a full batch of images plus form overhead
const MULTIPART_BODY_LIMIT: usize = MAX_IMAGE_BYTES * MAX_IMAGES_PER_MESSAGE + 1024 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to send a group text message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMessageRequest {
    /// Sending member account
    pub sender_account: Option<String>,
    /// Message text
    pub message: Option<String>,
    /// Stored message type, defaults to `text`
    #[serde(default)]
    pub message_type: Option<String>,
    /// Earlier message this one replies to
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
}

/// Request to mark a group thread read for one member
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkGroupReadRequest {
    /// Member whose unread counter is zeroed
    pub user_account: Option<String>,
}

/// Group thread response
#[derive(Debug, Serialize)]
pub struct GroupThreadResponse {
    /// Always `true`
    pub success: bool,
    /// Thread messages in chronological order
    pub messages: Vec<ThreadMessage>,
}

/// Group text send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMessageResponse {
    /// Always `true`
    pub success: bool,
    /// Id of the stored message
    pub message_id: String,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Group single-image send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupImageResponse {
    /// Always `true`
    pub success: bool,
    /// Id of the stored message
    pub message_id: String,
    /// Public URL of the uploaded image
    pub image_url: String,
    /// Thumbnail URL, same as the image URL
    pub thumbnail_url: String,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Group multi-image send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMultiImageResponse {
    /// Always `true`
    pub success: bool,
    /// Id of the stored message
    pub message_id: String,
    /// Public URLs in display order
    pub image_urls: Vec<String>,
    /// Number of images stored
    pub image_count: usize,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Bare success response
#[derive(Debug, Serialize)]
pub struct OkResponse {
    /// Always `true`
    pub success: bool,
}

// ============================================================================
// Group Message Routes
// ============================================================================

/// Group message routes handler
pub struct GroupMessageRoutes;

impl GroupMessageRoutes {
    /// Create all group message routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/groups/:group_id/messages", get(Self::get_thread))
            .route(
                "/api/groups/:group_id/messages/send",
                post(Self::send_text),
            )
            .route(
                "/api/groups/:group_id/messages/send-image",
                post(Self::send_image),
            )
            .route(
                "/api/groups/:group_id/messages/send-multi-images",
                post(Self::send_multi_images),
            )
            .route(
                "/api/groups/:group_id/messages/read",
                put(Self::mark_read),
            )
            .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
            .with_state(resources)
    }

    /// Full group thread with sender names and reply context
    async fn get_thread(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
    ) -> Result<Response, AppError> {
        let messages = resources
            .database
            .group_messages()
            .get_thread(&group_id)
            .await?;

        let response = GroupThreadResponse {
            success: true,
            messages,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a group text (or reply) message
    async fn send_text(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<SendGroupMessageRequest>,
    ) -> Result<Response, AppError> {
        let sender = require_field(request.sender_account, "senderAccount")?;
        let message = require_field(request.message, "message")?;
        let message_type = request
            .message_type
            .unwrap_or_else(|| message_types::TEXT.into());
        validate_account(&sender)?;
        validate_message(&message, &message_type)?;

        let receipt = resources
            .database
            .group_messages()
            .send_text(
                &group_id,
                &sender,
                &message,
                &message_type,
                request.reply_to_message_id.as_deref(),
            )
            .await?;

        let response = SendGroupMessageResponse {
            success: true,
            message_id: receipt.message_id,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a single image to a group
    async fn send_image(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = collect_image_form(multipart, "image", 1).await?;
        let sender = form.require("senderAccount")?;
        validate_account(&sender)?;
        let caption = form.field("message").unwrap_or_default();
        let reply_to = form.field("replyToMessageId");

        let (bytes, content_type) = form.files.into_iter().next().ok_or_else(|| {
            AppError::invalid_input("An image file is required")
        })?;
        let image_url = resources.blob_store.upload(bytes, &content_type).await?;

        let receipt = resources
            .database
            .group_messages()
            .send_image(&group_id, &sender, &image_url, &caption, reply_to.as_deref())
            .await?;

        let response = SendGroupImageResponse {
            success: true,
            message_id: receipt.message_id,
            thumbnail_url: image_url.clone(),
            image_url,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a batch of images to a group as one message
    async fn send_multi_images(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = collect_image_form(multipart, "images", MAX_IMAGES_PER_MESSAGE).await?;
        let sender = form.require("senderAccount")?;
        validate_account(&sender)?;
        let caption = form.field("message").unwrap_or_default();
        let reply_to = form.field("replyToMessageId");

        let image_urls = storage::upload_all(resources.blob_store.as_ref(), form.files).await?;

        let receipt = resources
            .database
            .group_messages()
            .send_multi_image(
                &group_id,
                &sender,
                &image_urls,
                &caption,
                reply_to.as_deref(),
            )
            .await?;

        let image_count = image_urls.len();
        let response = SendGroupMultiImageResponse {
            success: true,
            message_id: receipt.message_id,
            image_urls,
            image_count,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Zero the caller's unread counter for this group
    async fn mark_read(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<MarkGroupReadRequest>,
    ) -> Result<Response, AppError> {
        let user_account = require_field(request.user_account, "userAccount")?;
        validate_account(&user_account)?;

        resources
            .database
            .group_messages()
            .mark_as_read(&group_id, &user_account)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }
}
