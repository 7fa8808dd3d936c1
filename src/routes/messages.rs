// ABOUTME: Direct message endpoints - thread retrieval, text and image sends, read marking
// ABOUTME: Image uploads complete before any database transaction begins
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct message routes
//!
//! Fetching a thread also marks it read from the caller's perspective.
//! Image sends upload every blob first; a failed upload aborts the request
//! before any database write.

use crate::errors::{AppError, AppResult};
use crate::models::{message_types, MessageImageRecord, ThreadMessage};
use crate::routes::{require_field, validate_account, validate_message};
use crate::server::ServerResources;
use crate::storage::{
    self, is_allowed_image_type, MAX_IMAGES_PER_MESSAGE, MAX_IMAGE_BYTES,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Multipart request body limit: a full batch of images plus form overhead
const MULTIPART_BODY_LIMIT: usize = MAX_IMAGE_BYTES * MAX_IMAGES_PER_MESSAGE + 1024 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for fetching a thread between two accounts
#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    /// Caller's account; the thread is marked read for this side
    pub account1: Option<String>,
    /// The other account of the pair
    pub account2: Option<String>,
}

/// Request to send a text message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Sending account
    pub sender_account: Option<String>,
    /// Receiving account
    pub receiver_account: Option<String>,
    /// Message text
    pub message: Option<String>,
    /// Stored message type, defaults to `text`
    #[serde(default)]
    pub message_type: Option<String>,
    /// Earlier message this one replies to
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
}

/// Request to mark a thread read
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    /// Account whose unread counter is zeroed
    pub user_account: Option<String>,
    /// Contact whose messages are marked read
    pub contact_account: Option<String>,
}

/// Thread response
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    /// Always `true`
    pub success: bool,
    /// Thread messages in chronological order
    pub messages: Vec<ThreadMessage>,
}

/// Text send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    /// Always `true`
    pub success: bool,
    /// Id of the stored message
    pub message_id: String,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Single-image send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendImageResponse {
    /// Always `true`
    pub success: bool,
    /// Id of the stored message
    pub message_id: String,
    /// Public URL of the uploaded image
    pub image_url: String,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Multi-image send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMultiImageResponse {
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

/// Message image list response
#[derive(Debug, Serialize)]
pub struct MessageImagesResponse {
    /// Always `true`
    pub success: bool,
    /// Child image rows in display order
    pub images: Vec<MessageImageRecord>,
}

/// Bare success response
#[derive(Debug, Serialize)]
pub struct OkResponse {
    /// Always `true`
    pub success: bool,
}

// ============================================================================
// Multipart form handling
// ============================================================================

/// Parsed multipart image form: validated files plus text fields
pub(crate) struct ImageForm {
    pub files: Vec<(Bytes, String)>,
    pub fields: HashMap<String, String>,
}

impl ImageForm {
    pub(crate) fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.is_empty()).cloned()
    }

    pub(crate) fn require(&self, name: &str) -> AppResult<String> {
        require_field(self.field(name), name)
    }
}

/// Read a multipart form, validating each file part against the image rules
///
/// `file_field` names the part carrying image data; other parts are kept as
/// text fields. Enforces the content-type allowlist, the per-image size cap
/// and the batch limit before anything touches the blob store.
pub(crate) async fn collect_image_form(
    mut multipart: Multipart,
    file_field: &str,
    max_files: usize,
) -> AppResult<ImageForm> {
    let mut files = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_input(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == file_field {
            if files.len() >= max_files {
                return Err(AppError::invalid_input(format!(
                    "Too many images (max {max_files})"
                )));
            }
            let content_type = field.content_type().unwrap_or_default().to_owned();
            if !is_allowed_image_type(&content_type) {
                return Err(AppError::invalid_input(
                    "Only image files are allowed (jpeg, jpg, png, gif, webp)",
                ));
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::invalid_input(format!("Failed to read image data: {e}")))?;
            if bytes.len() > MAX_IMAGE_BYTES {
                return Err(AppError::invalid_input(
                    "Image exceeds the 10 MiB size limit",
                ));
            }
            files.push((bytes, content_type));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::invalid_input(format!("Malformed form field: {e}")))?;
            fields.insert(name, value);
        }
    }

    if files.is_empty() {
        return Err(AppError::invalid_input("An image file is required"));
    }

    Ok(ImageForm { files, fields })
}

// ============================================================================
// Message Routes
// ============================================================================

/// Direct message routes handler
pub struct MessageRoutes;

impl MessageRoutes {
    /// Create all direct message routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/messages", get(Self::get_thread))
            .route("/api/messages/send", post(Self::send_text))
            .route("/api/messages/send-image", post(Self::send_image))
            .route(
                "/api/messages/send-multi-images",
                post(Self::send_multi_images),
            )
            .route("/api/messages/read", put(Self::mark_read))
            .route("/api/messages/:message_id/images", get(Self::get_images))
            .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
            .with_state(resources)
    }

    /// Fetch the thread between two accounts and mark it read for `account1`
    async fn get_thread(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<ThreadQuery>,
    ) -> Result<Response, AppError> {
        let account1 = require_field(query.account1, "account1")?;
        let account2 = require_field(query.account2, "account2")?;
        validate_account(&account1)?;
        validate_account(&account2)?;

        let messages = resources
            .database
            .messages()
            .get_thread(&account1, &account2)
            .await?;
        resources
            .database
            .conversations()
            .mark_as_read(&account1, &account2)
            .await?;

        let response = ThreadResponse {
            success: true,
            messages,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a text (or reply) message
    async fn send_text(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SendMessageRequest>,
    ) -> Result<Response, AppError> {
        let sender = require_field(request.sender_account, "senderAccount")?;
        let receiver = require_field(request.receiver_account, "receiverAccount")?;
        let message = require_field(request.message, "message")?;
        let message_type = request
            .message_type
            .unwrap_or_else(|| message_types::TEXT.into());
        validate_account(&sender)?;
        validate_account(&receiver)?;
        validate_message(&message, &message_type)?;

        let receipt = resources
            .database
            .messages()
            .send_text(
                &sender,
                &receiver,
                &message,
                &message_type,
                request.reply_to_message_id.as_deref(),
            )
            .await?;

        let response = SendMessageResponse {
            success: true,
            message_id: receipt.message_id,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a single image; the upload completes before the database write
    async fn send_image(
        State(resources): State<Arc<ServerResources>>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = collect_image_form(multipart, "image", 1).await?;
        let sender = form.require("senderAccount")?;
        let receiver = form.require("receiverAccount")?;
        validate_account(&sender)?;
        validate_account(&receiver)?;
        let reply_to = form.field("replyToMessageId");

        let (bytes, content_type) = form.files.into_iter().next().ok_or_else(|| {
            AppError::invalid_input("An image file is required")
        })?;
        let image_url = resources.blob_store.upload(bytes, &content_type).await?;

        let receipt = resources
            .database
            .messages()
            .send_image(&sender, &receiver, &image_url, reply_to.as_deref())
            .await?;

        let response = SendImageResponse {
            success: true,
            message_id: receipt.message_id,
            image_url,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Send a batch of images as one message
    ///
    /// All uploads must succeed before anything is written; a partial batch
    /// never reaches the database.
    async fn send_multi_images(
        State(resources): State<Arc<ServerResources>>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = collect_image_form(multipart, "images", MAX_IMAGES_PER_MESSAGE).await?;
        let sender = form.require("senderAccount")?;
        let receiver = form.require("receiverAccount")?;
        validate_account(&sender)?;
        validate_account(&receiver)?;
        let caption = form.field("message").unwrap_or_default();
        let reply_to = form.field("replyToMessageId");

        let image_urls = storage::upload_all(resources.blob_store.as_ref(), form.files).await?;

        let receipt = resources
            .database
            .messages()
            .send_multi_image(
                &sender,
                &receiver,
                &image_urls,
                &caption,
                reply_to.as_deref(),
            )
            .await?;

        let image_count = image_urls.len();
        let response = SendMultiImageResponse {
            success: true,
            message_id: receipt.message_id,
            image_urls,
            image_count,
            timestamp: receipt.timestamp,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Mark all messages from a contact as read
    async fn mark_read(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<MarkReadRequest>,
    ) -> Result<Response, AppError> {
        let user_account = require_field(request.user_account, "userAccount")?;
        let contact_account = require_field(request.contact_account, "contactAccount")?;
        validate_account(&user_account)?;
        validate_account(&contact_account)?;

        resources
            .database
            .conversations()
            .mark_as_read(&user_account, &contact_account)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }

    /// List a message's images in display order
    async fn get_images(
        State(resources): State<Arc<ServerResources>>,
        Path(message_id): Path<String>,
    ) -> Result<Response, AppError> {
        let images = resources
            .database
            .messages()
            .get_message_images(&message_id)
            .await?;

        let response = MessageImagesResponse {
            success: true,
            images,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
