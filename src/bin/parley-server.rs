// ABOUTME: Server binary wiring config, database, blob store and HTTP listener
// ABOUTME: Environment-driven startup with a CLI port override
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Parley Chat Server Binary
//!
//! Starts the chat backend: loads configuration from the environment, runs
//! database migrations, builds the shared resources and serves the HTTP API.

use anyhow::Result;
use clap::Parser;
use parley_server::{
    config::ServerConfig,
    database::Database,
    logging,
    server::{build_router, ServerResources},
    storage::HttpBlobStore,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "parley-server")]
#[command(about = "Parley - chat backend with direct and group messaging")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle container environments where clap may not work properly
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using default configuration");
            Args { http_port: None }
        }
    };

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Parley chat server");
    info!("{}", config.summary());

    let database = Database::new(&config.database.url, &config.database.schema).await?;
    info!("Database initialized: {}", config.database.url);

    let blob_store = Arc::new(HttpBlobStore::new(config.blob_store.clone()));
    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, blob_store, config));

    let app = build_router(resources);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("HTTP server listening on port {port}");

    axum::serve(listener, app).await?;
    Ok(())
}
