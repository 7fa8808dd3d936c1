// ABOUTME: Health check endpoint reporting service and database status
// ABOUTME: Probes the database with a trivial query on every request
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AppError;
use crate::server::ServerResources;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always true when the handler runs
    pub success: bool,
    /// `ok` when the database responds
    pub status: String,
    /// Database reachability
    pub database: String,
}

/// Health routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create health routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/health", get(Self::health))
            .with_state(resources)
    }

    async fn health(State(resources): State<Arc<ServerResources>>) -> Result<Response, AppError> {
        let database = match sqlx::query("SELECT 1")
            .execute(resources.database.pool())
            .await
        {
            Ok(_) => "connected",
            Err(e) => {
                tracing::warn!("health check database probe failed: {e}");
                "unavailable"
            }
        };

        let response = HealthResponse {
            success: true,
            status: if database == "connected" {
                "ok".into()
            } else {
                "degraded".into()
            },
            database: database.into(),
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
