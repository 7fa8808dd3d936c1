// ABOUTME: Unified error handling with domain error codes and HTTP response mapping
// ABOUTME: Every failure surfaces through AppError and the JSON failure envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Unified Error Handling
//!
//! This module defines the error taxonomy used across the whole service:
//! validation, not-found, conflict, permission, upload, database and internal
//! errors. Route handlers return `Result<_, AppError>` and let axum render the
//! uniform `{"success": false, "error": CODE, "message": ...}` envelope via
//! the `IntoResponse` implementation; handlers never catch errors themselves.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed or out-of-range request value (400)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    /// Required request field absent or empty (400)
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField,

    /// Action forbidden by a domain invariant (400, with an explanatory
    /// message)
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied,

    /// Unknown account, group, member or message (404)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound,
    /// Duplicate unique key, e.g. re-adding a group member (409)
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists,

    /// Blob store upload failure (500)
    #[serde(rename = "UPLOAD_FAILED")]
    UploadFailed,
    /// Database statement or connection failure (500)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,

    /// Invalid or missing deployment configuration (500)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    /// Any other unexpected failure (500)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            // Creator-removal rejections are deliberate 400s, not 403s: the
            // request asks for a transition the group state machine never has.
            Self::InvalidInput | Self::MissingRequiredField | Self::PermissionDenied => {
                StatusCode::BAD_REQUEST
            }
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::ResourceAlreadyExists => StatusCode::CONFLICT,
            Self::UploadFailed | Self::DatabaseError | Self::ConfigError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-facing description of this error class
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::PermissionDenied => "This action is not permitted",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::UploadFailed => "Blob storage upload failed",
            Self::DatabaseError => "Database operation failed",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal server error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// A required request field is absent or empty
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {field}"),
        )
    }

    /// Action forbidden by a domain invariant
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Duplicate unique key
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Blob store failure
    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UploadFailed, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("Database row"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::conflict(format!("Unique constraint violated: {db_err}"))
            }
            _ => {
                let message = error.to_string();
                Self::database(message).with_source(error)
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// JSON failure envelope: `{"success": false, "error": CODE, "message": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error code
    pub error: ErrorCode,
    /// Human-readable explanation
    pub message: String,
    /// Source chain detail, emitted in debug builds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let detail = if cfg!(debug_assertions) {
            error.source.as_ref().map(ToString::to_string)
        } else {
            None
        };
        Self {
            success: false,
            error: error.code,
            message: error.message,
            detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "request failed");
        } else {
            tracing::debug!(code = ?self.code, message = %self.message, "request rejected");
        }
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}
