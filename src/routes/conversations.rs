// ABOUTME: Direct conversation list, deletion and unread total endpoints
// ABOUTME: Serves the denormalized projection rows maintained by message sends
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AppError;
use crate::models::ConversationRecord;
use crate::routes::validate_account;
use crate::server::ServerResources;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters identifying one side of a conversation pair
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPairQuery {
    /// Row owner's account
    pub user_account: Option<String>,
    /// The other side of the pair
    pub contact_account: Option<String>,
}

/// Conversation list response
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    /// Always `true`
    pub success: bool,
    /// Projection rows, most recent message first
    pub conversations: Vec<ConversationRecord>,
}

/// Unread count response
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    /// Always `true`
    pub success: bool,
    /// Summed unread count
    pub count: i64,
}

/// Bare success response
#[derive(Debug, Serialize)]
pub struct OkResponse {
    /// Always `true`
    pub success: bool,
}

/// Conversation routes handler
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations/:account", get(Self::list))
            .route("/api/conversations", delete(Self::delete_conversation))
            .route(
                "/api/conversations/unread/count/:account",
                get(Self::unread_count),
            )
            .with_state(resources)
    }

    /// List a user's conversations, most recent message first
    async fn list(
        State(resources): State<Arc<ServerResources>>,
        Path(account): Path<String>,
    ) -> Result<Response, AppError> {
        validate_account(&account)?;

        let conversations = resources.database.conversations().list(&account).await?;

        let response = ConversationListResponse {
            success: true,
            conversations,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Delete one side of a conversation and the underlying direct messages
    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<ConversationPairQuery>,
    ) -> Result<Response, AppError> {
        let user_account = query
            .user_account
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::missing_field("userAccount"))?;
        let contact_account = query
            .contact_account
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::missing_field("contactAccount"))?;
        validate_account(&user_account)?;
        validate_account(&contact_account)?;

        resources
            .database
            .conversations()
            .delete(&user_account, &contact_account)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }

    /// Total unread direct messages across all of a user's conversations
    async fn unread_count(
        State(resources): State<Arc<ServerResources>>,
        Path(account): Path<String>,
    ) -> Result<Response, AppError> {
        validate_account(&account)?;

        let count = resources
            .database
            .conversations()
            .unread_total(&account)
            .await?;

        let response = UnreadCountResponse {
            success: true,
            count,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
