// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration management
//!
//! Configuration is environment-only: every knob comes from a variable with a
//! development-friendly default. The schema namespace is the only value that
//! ever reaches SQL text, and it is fixed per deployment, never derived from
//! request input.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment type for logging and error-detail behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL (`sqlite:...` by default)
    pub url: String,
    /// Schema namespace qualifying every table name (`main` for SQLite)
    pub schema: String,
}

/// External blob store settings (Supabase-style storage API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    /// Storage API base URL, e.g. `https://xyz.supabase.co/storage/v1`
    pub base_url: String,
    /// Service key sent as a bearer token
    pub service_key: String,
    /// Logical bucket holding chat images
    pub bucket: String,
}

/// Server configuration assembled from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Database settings
    pub database: DatabaseConfig,
    /// Blob store settings
    pub blob_store: BlobStoreConfig,
    /// Comma-separated CORS origins, or `*` for any
    pub cors_allowed_origins: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse (e.g. a non-numeric
    /// `HTTP_PORT`).
    pub fn from_env() -> Result<Self> {
        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .context("Invalid HTTP_PORT")?;

        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        );

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/parley.db".into()),
            schema: env::var("DATABASE_SCHEMA").unwrap_or_else(|_| "main".into()),
        };

        let blob_store = BlobStoreConfig {
            base_url: env::var("BLOB_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:54321/storage/v1".into()),
            service_key: env::var("BLOB_STORE_KEY").unwrap_or_default(),
            bucket: env::var("BLOB_STORE_BUCKET").unwrap_or_else(|_| "chat-images".into()),
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".into());

        Ok(Self {
            http_port,
            environment,
            database,
            blob_store,
            cors_allowed_origins,
        })
    }

    /// One-line startup summary (never includes secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "env={} port={} db={} schema={} bucket={}",
            self.environment,
            self.http_port,
            self.database.url,
            self.database.schema,
            self.blob_store.bucket
        )
    }
}
