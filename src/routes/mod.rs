// ABOUTME: HTTP route handlers grouped by domain area
// ABOUTME: Shared request validation helpers live at the module root
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API routes
//!
//! Each submodule owns one resource area and exposes a `XxxRoutes` struct
//! whose `routes()` builds an axum `Router` over shared `ServerResources`.
//! Validation failures surface as 400s with the standard error envelope
//! before any manager call runs.

use crate::errors::{AppError, AppResult};

pub mod conversations;
pub mod group_messages;
pub mod groups;
pub mod health;
pub mod messages;
pub mod users;

/// Maximum account identifier length
pub const MAX_ACCOUNT_LEN: usize = 50;
/// Maximum message text length
pub const MAX_MESSAGE_LEN: usize = 5000;
/// Maximum group name length
pub const MAX_GROUP_NAME_LEN: usize = 100;

/// Check one account identifier: non-empty, at most 50 characters
pub(crate) fn validate_account(account: &str) -> AppResult<()> {
    if account.is_empty() || account.chars().count() > MAX_ACCOUNT_LEN {
        return Err(AppError::invalid_input("Invalid account format"));
    }
    Ok(())
}

/// Check message text for a given type; image messages may have empty text
pub(crate) fn validate_message(message: &str, message_type: &str) -> AppResult<()> {
    use crate::models::message_types;

    if message_type == message_types::IMAGE || message_type == message_types::MULTI_IMAGE {
        return Ok(());
    }
    if message.is_empty() {
        return Err(AppError::invalid_input("Message content is required"));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::invalid_input(
            "Message is too long (max 5000 characters)",
        ));
    }
    Ok(())
}

/// Check a group name: non-empty, at most 100 characters
pub(crate) fn validate_group_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::invalid_input("Group name is required"));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(AppError::invalid_input(
            "Group name is too long (max 100 characters)",
        ));
    }
    Ok(())
}

/// Unwrap a required request field or fail with the field's name
pub(crate) fn require_field(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::missing_field(field)),
    }
}
