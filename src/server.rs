// ABOUTME: Shared server resources and top-level axum router assembly
// ABOUTME: Centralizes database, blob store and config handles behind one Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server resources and router
//!
//! `ServerResources` is created once at startup and passed to every route
//! group as a single `Arc`. Handlers never construct their own pools or
//! clients.

use crate::config::ServerConfig;
use crate::database::Database;
use crate::routes::{
    conversations::ConversationRoutes, group_messages::GroupMessageRoutes, groups::GroupRoutes,
    health::HealthRoutes, messages::MessageRoutes, users::UserRoutes,
};
use crate::storage::BlobStore;
use axum::Router;
use http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// All shared server resources
///
/// Holds every handle the route handlers need. Created once in `main` (or a
/// test harness) and shared via `Arc`.
pub struct ServerResources {
    /// Database handle with schema-qualified table names
    pub database: Database,
    /// External image store
    pub blob_store: Arc<dyn BlobStore>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Bundle the startup handles
    #[must_use]
    pub fn new(database: Database, blob_store: Arc<dyn BlobStore>, config: ServerConfig) -> Self {
        Self {
            database,
            blob_store,
            config: Arc::new(config),
        }
    }
}

/// Configure CORS from the comma-separated origin list (`*` allows any)
fn setup_cors(config: &ServerConfig) -> CorsLayer {
    let allow_origin = if config.cors_allowed_origins.is_empty()
        || config.cors_allowed_origins == "*"
    {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    HeaderValue::from_str(trimmed).ok()
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Build the complete application router over shared resources
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config);

    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(ConversationRoutes::routes(resources.clone()))
        .merge(MessageRoutes::routes(resources.clone()))
        .merge(GroupRoutes::routes(resources.clone()))
        .merge(GroupMessageRoutes::routes(resources.clone()))
        .merge(UserRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
