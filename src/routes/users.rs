// ABOUTME: Account directory search for starting new conversations
// ABOUTME: Read-only lookup over the externally-owned accounts table
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AppError;
use crate::server::ServerResources;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::sync::Arc;

/// Query parameters for user search
#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    /// Keyword matched against account and display name
    pub q: Option<String>,
    /// Account to omit from results (usually the caller)
    #[serde(rename = "excludeAccount")]
    pub exclude_account: Option<String>,
}

/// One directory hit
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchHit {
    /// Account identifier
    pub account: String,
    /// Display name
    pub account_name: Option<String>,
    /// Owning customer, when linked
    pub customer_id: Option<String>,
}

/// User search response
#[derive(Debug, Serialize)]
pub struct UserSearchResponse {
    /// Always `true`
    pub success: bool,
    /// Matching directory entries
    pub users: Vec<UserSearchHit>,
}

/// User directory routes handler
pub struct UserRoutes;

impl UserRoutes {
    /// Create user routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/users/search", get(Self::search))
            .with_state(resources)
    }

    /// Case-insensitive substring search over account and display name,
    /// excluding the caller, capped at 20 results
    async fn search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserSearchQuery>,
    ) -> Result<Response, AppError> {
        let keyword = query
            .q
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::missing_field("q"))?;
        let exclude = query.exclude_account.unwrap_or_default();

        let tables = resources.database.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT account, description, customer_id
            FROM {accounts}
            WHERE (account LIKE $1 OR description LIKE $1)
              AND account != $2
            ORDER BY description
            LIMIT 20
            ",
            accounts = tables.accounts
        ))
        .bind(format!("%{keyword}%"))
        .bind(&exclude)
        .fetch_all(resources.database.pool())
        .await?;

        let users = rows
            .iter()
            .map(|row| {
                Ok(UserSearchHit {
                    account: row.try_get("account")?,
                    account_name: row.try_get("description")?,
                    customer_id: row.try_get("customer_id")?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let response = UserSearchResponse {
            success: true,
            users,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
