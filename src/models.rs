// ABOUTME: Database record types for messages, conversations, groups and memberships
// ABOUTME: Plain serde structs with string ids and RFC 3339 string timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain record types
//!
//! All timestamps are RFC 3339 strings assigned by the data layer at insert
//! time; clients never supply them. Exactly one of `receiver_account` /
//! `group_id` is meaningful on a message, discriminated by
//! `is_group_message`.

use serde::{Deserialize, Serialize};

/// Message type discriminator stored on every message row
pub mod message_types {
    /// Plain text message
    pub const TEXT: &str = "text";
    /// Single-image message
    pub const IMAGE: &str = "image";
    /// Multi-image message with child rows
    pub const MULTI_IMAGE: &str = "multi_image";
    /// Reply referencing an earlier message
    pub const REPLY: &str = "reply";
}

/// Group member roles
pub mod roles {
    /// Group administrator (the creator's fixed role)
    pub const ADMIN: &str = "admin";
    /// Regular member
    pub const MEMBER: &str = "member";
}

/// Database representation of a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Unique message id
    pub message_id: String,
    /// Sending account
    pub sender_account: String,
    /// Receiving account (None for group messages)
    pub receiver_account: Option<String>,
    /// Owning group (None for direct messages)
    pub group_id: Option<String>,
    /// Discriminator between direct and group messages
    pub is_group_message: bool,
    /// Full message text (summaries truncate, this never does)
    pub message: String,
    /// text | image | multi_image | reply
    pub message_type: String,
    /// Public URL for single-image messages
    pub image_url: Option<String>,
    /// Thumbnail URL when available
    pub thumbnail_url: Option<String>,
    /// Number of child image rows (0 for non-multi-image messages)
    pub image_count: i64,
    /// Message this one replies to, if any
    pub reply_to_message_id: Option<String>,
    /// Server-assigned RFC 3339 timestamp
    pub timestamp: String,
    /// Read flag (direct messages only; false until marked read)
    pub is_read: bool,
    /// When the message was marked read
    pub read_at: Option<String>,
}

/// Child row of a multi-image message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageImageRecord {
    /// Unique image id
    pub image_id: String,
    /// Owning message
    pub message_id: String,
    /// Public image URL
    pub image_url: String,
    /// Thumbnail URL when available
    pub thumbnail_url: Option<String>,
    /// 0-based display order, unique per message
    pub image_order: i64,
}

/// A direct message enriched with reply context and child images for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    /// The message row itself
    #[serde(flatten)]
    pub message: MessageRecord,
    /// Display name of the sender (group threads)
    pub sender_name: Option<String>,
    /// Text of the replied-to message, if it still exists
    pub reply_to_message: Option<String>,
    /// Sender account of the replied-to message
    pub reply_to_sender: Option<String>,
    /// Display name of the replied-to sender
    pub reply_to_sender_name: Option<String>,
    /// Child image rows in display order (empty unless `image_count > 0`)
    pub images: Vec<MessageImageRecord>,
}

/// Per-ordered-pair direct conversation projection row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Deterministic composite id (`conv_{user}_{contact}`)
    pub conversation_id: String,
    /// Row owner's account; this is their view of the pair
    pub user_account: String,
    /// The other party
    pub contact_account: String,
    /// Display name of the contact, when the account row exists
    pub contact_name: Option<String>,
    /// Preview of the latest message, truncated to 100 chars
    pub last_message: String,
    /// Timestamp of the latest message
    pub last_message_time: Option<String>,
    /// Unread messages from the contact, never negative
    pub unread_count: i64,
    /// Last projection update
    pub updated_at: String,
}

/// Chat group row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// Unique group id
    pub group_id: String,
    /// Group display name
    pub group_name: String,
    /// Optional description
    pub group_description: Option<String>,
    /// Immutable owner reference; the creator can never be removed
    pub created_by: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Group details with creator name and member count for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetails {
    /// Flattened group fields
    #[serde(flatten)]
    pub group: GroupRecord,
    /// Creator's display name
    pub creator_name: Option<String>,
    /// Current member count
    pub member_count: i64,
}

/// Group membership row, unique per (`group_id`, `user_account`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRecord {
    /// Unique member id
    pub member_id: String,
    /// Owning group
    pub group_id: String,
    /// Member account
    pub user_account: String,
    /// admin | member (the creator's row is always admin)
    pub role: String,
    /// When the member joined
    pub joined_at: String,
    /// Last message the member has read, if tracked
    pub last_read_message_id: Option<String>,
    /// Display name from the accounts directory
    pub member_name: Option<String>,
}

/// A user's group membership joined with group info and their projection row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    /// Flattened group fields
    #[serde(flatten)]
    pub group: GroupRecord,
    /// The user's role in this group
    pub role: String,
    /// When the user joined
    pub joined_at: String,
    /// Latest message preview from the user's projection row
    pub last_message: Option<String>,
    /// Latest message time from the user's projection row
    pub last_message_time: Option<String>,
    /// The user's unread count for this group
    pub unread_count: i64,
    /// Current member count
    pub member_count: i64,
}
