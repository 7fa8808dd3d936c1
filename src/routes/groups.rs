// ABOUTME: Group lifecycle endpoints - creation, membership, search, info updates
// ABOUTME: Membership changes keep projection rows in sync inside the data layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AppError;
use crate::models::{roles, GroupDetails, GroupMemberRecord, GroupRecord, UserGroup};
use crate::routes::{require_field, validate_account, validate_group_name};
use crate::server::ServerResources;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a group
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    /// Group display name
    pub group_name: Option<String>,
    /// Creator account, seeded as the admin member
    pub created_by: Option<String>,
    /// Group description
    #[serde(default)]
    pub description: Option<String>,
    /// Accounts invited at creation; duplicates and the creator are skipped
    #[serde(default)]
    pub member_accounts: Vec<String>,
}

/// Request naming one member account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    /// Target member account
    pub user_account: Option<String>,
    /// Role for the new member, defaults to `member`
    #[serde(default)]
    pub role: Option<String>,
}

/// Request to update group info; both fields optional, at least one required
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    /// Group display name
    #[serde(default)]
    pub group_name: Option<String>,
    /// Group description
    #[serde(default)]
    pub description: Option<String>,
}

/// Query parameters for group search
#[derive(Debug, Deserialize)]
pub struct GroupSearchQuery {
    /// Name substring to match
    pub q: Option<String>,
}

/// Group creation response
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    /// Always `true`
    pub success: bool,
    /// The group record
    pub group: GroupRecord,
}

/// Group details response
#[derive(Debug, Serialize)]
pub struct GroupDetailsResponse {
    /// Always `true`
    pub success: bool,
    /// The group record
    pub group: GroupDetails,
}

/// User groups list response
#[derive(Debug, Serialize)]
pub struct UserGroupsResponse {
    /// Always `true`
    pub success: bool,
    /// Matching groups
    pub groups: Vec<UserGroup>,
}

/// Group search response
#[derive(Debug, Serialize)]
pub struct GroupSearchResponse {
    /// Always `true`
    pub success: bool,
    /// Matching groups
    pub groups: Vec<GroupDetails>,
}

/// Group member list response
#[derive(Debug, Serialize)]
pub struct GroupMembersResponse {
    /// Always `true`
    pub success: bool,
    /// Member rows, admins first
    pub members: Vec<GroupMemberRecord>,
}

/// Unread count response
#[derive(Debug, Serialize)]
pub struct GroupUnreadResponse {
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

// ============================================================================
// Group Routes
// ============================================================================

/// Group routes handler
pub struct GroupRoutes;

impl GroupRoutes {
    /// Create all group routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/groups/create", post(Self::create_group))
            .route("/api/groups/user/:account", get(Self::user_groups))
            .route("/api/groups/search", get(Self::search))
            .route(
                "/api/groups/unread/count/:account",
                get(Self::unread_count),
            )
            .route("/api/groups/:group_id", get(Self::group_details))
            .route("/api/groups/:group_id/members", get(Self::group_members))
            .route("/api/groups/:group_id/members/add", post(Self::add_member))
            .route(
                "/api/groups/:group_id/members/remove",
                delete(Self::remove_member),
            )
            .route("/api/groups/:group_id/leave", post(Self::leave_group))
            .route("/api/groups/:group_id/update", put(Self::update_group))
            .with_state(resources)
    }

    /// Create a group with the creator as admin plus any invitees
    async fn create_group(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CreateGroupRequest>,
    ) -> Result<Response, AppError> {
        let group_name = require_field(request.group_name, "groupName")?;
        let created_by = require_field(request.created_by, "createdBy")?;
        validate_group_name(&group_name)?;
        validate_account(&created_by)?;
        for account in &request.member_accounts {
            validate_account(account)?;
        }

        let group = resources
            .database
            .groups()
            .create_group(
                &group_name,
                &created_by,
                request.description.as_deref(),
                &request.member_accounts,
            )
            .await?;

        let response = GroupResponse {
            success: true,
            group,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// List the groups a user belongs to
    async fn user_groups(
        State(resources): State<Arc<ServerResources>>,
        Path(account): Path<String>,
    ) -> Result<Response, AppError> {
        validate_account(&account)?;

        let groups = resources.database.groups().user_groups(&account).await?;

        let response = UserGroupsResponse {
            success: true,
            groups,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Search groups by name
    async fn search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<GroupSearchQuery>,
    ) -> Result<Response, AppError> {
        let keyword = require_field(query.q, "q")?;

        let groups = resources.database.groups().search(&keyword).await?;

        let response = GroupSearchResponse {
            success: true,
            groups,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Total unread group messages for a user
    async fn unread_count(
        State(resources): State<Arc<ServerResources>>,
        Path(account): Path<String>,
    ) -> Result<Response, AppError> {
        validate_account(&account)?;

        let count = resources.database.groups().unread_total(&account).await?;

        let response = GroupUnreadResponse {
            success: true,
            count,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Group details with creator name and member count
    async fn group_details(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
    ) -> Result<Response, AppError> {
        let group = resources.database.groups().group_details(&group_id).await?;

        let response = GroupDetailsResponse {
            success: true,
            group,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Group member list: admins first, then join order
    async fn group_members(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
    ) -> Result<Response, AppError> {
        let members = resources.database.groups().group_members(&group_id).await?;

        let response = GroupMembersResponse {
            success: true,
            members,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Add a member to a group
    async fn add_member(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<MemberRequest>,
    ) -> Result<Response, AppError> {
        let user_account = require_field(request.user_account, "userAccount")?;
        validate_account(&user_account)?;
        let role = request.role.unwrap_or_else(|| roles::MEMBER.into());

        resources
            .database
            .groups()
            .add_member(&group_id, &user_account, &role)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }

    /// Remove a member from a group; the creator can never be removed
    async fn remove_member(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<MemberRequest>,
    ) -> Result<Response, AppError> {
        let user_account = require_field(request.user_account, "userAccount")?;
        validate_account(&user_account)?;

        resources
            .database
            .groups()
            .remove_member(&group_id, &user_account)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }

    /// Leave a group; same creator guard as removal
    async fn leave_group(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<MemberRequest>,
    ) -> Result<Response, AppError> {
        let user_account = require_field(request.user_account, "userAccount")?;
        validate_account(&user_account)?;

        resources
            .database
            .groups()
            .remove_member(&group_id, &user_account)
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }

    /// Update group name and/or description
    async fn update_group(
        State(resources): State<Arc<ServerResources>>,
        Path(group_id): Path<String>,
        Json(request): Json<UpdateGroupRequest>,
    ) -> Result<Response, AppError> {
        if let Some(name) = request.group_name.as_deref() {
            validate_group_name(name)?;
        }

        resources
            .database
            .groups()
            .update_info(
                &group_id,
                request.group_name.as_deref(),
                request.description.as_deref(),
            )
            .await?;

        Ok((StatusCode::OK, Json(OkResponse { success: true })).into_response())
    }
}
