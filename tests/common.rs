// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory database, blob store and account fixture helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code, clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Shared test utilities for `parley_server`
//!
//! Builds a complete in-memory server (SQLite + memory blob store) and seeds
//! the account fixtures the route tests rely on.

use anyhow::Result;
use parley_server::{
    config::{BlobStoreConfig, DatabaseConfig, Environment, ServerConfig},
    database::Database,
    server::ServerResources,
    storage::MemoryBlobStore,
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration for an in-memory test server
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: "sqlite::memory:".into(),
            schema: "main".into(),
        },
        blob_store: BlobStoreConfig {
            base_url: "http://localhost:54321/storage/v1".into(),
            service_key: String::new(),
            bucket: "chat-images".into(),
        },
        cors_allowed_origins: "*".into(),
    }
}

/// Standard test database setup with migrations applied
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::new("sqlite::memory:", "main").await?)
}

/// Full server resources over an in-memory database and blob store
///
/// Returns the blob store handle separately so tests can inspect uploads.
pub async fn create_test_resources() -> Result<(Arc<ServerResources>, Arc<MemoryBlobStore>)> {
    create_test_resources_with_store(Arc::new(MemoryBlobStore::new())).await
}

/// Same as [`create_test_resources`] but with a caller-provided blob store
/// (used to inject upload failures)
pub async fn create_test_resources_with_store(
    store: Arc<MemoryBlobStore>,
) -> Result<(Arc<ServerResources>, Arc<MemoryBlobStore>)> {
    let database = create_test_database().await?;
    seed_accounts(&database).await?;
    let resources = Arc::new(ServerResources::new(
        database,
        store.clone(),
        test_config(),
    ));
    Ok((resources, store))
}

/// Insert the standard account fixtures: alice, bob and carol
pub async fn seed_accounts(database: &Database) -> Result<()> {
    for (account, name) in [
        ("alice", "Alice Chen"),
        ("bob", "Bob Lin"),
        ("carol", "Carol Wu"),
    ] {
        sqlx::query("INSERT INTO accounts (account, description) VALUES ($1, $2)")
            .bind(account)
            .bind(name)
            .execute(database.pool())
            .await?;
    }
    Ok(())
}

/// One-pixel GIF payload for image upload tests
pub const TINY_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff\x21\xf9\x04\x00\x00\x00\x00\x00\x2c\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02\x44\x01\x00\x3b";
