// ABOUTME: Database handle owning the connection pool, migrations and schema qualifier
// ABOUTME: Manager types for messages, conversations, groups and group messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Database Management
//!
//! One `Database` handle owns the sqlx pool for the whole process; every
//! manager borrows a clone of it. Tables live in a configurable schema
//! namespace (`main` for SQLite) rendered by [`Tables`]; the namespace comes
//! from deployment configuration and is the only identifier ever interpolated
//! into SQL text. All values are bound parameters.

pub mod conversations;
pub mod group_messages;
pub mod groups;
pub mod messages;
pub mod transactions;

pub use conversations::ConversationManager;
pub use group_messages::GroupMessageManager;
pub use groups::GroupManager;
pub use messages::MessageManager;
pub use transactions::TransactionGuard;

use crate::errors::AppResult;
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

/// Maximum characters of a message echoed into a projection preview
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Current timestamp in the canonical stored format
///
/// RFC 3339 UTC with microseconds: fixed width, so lexicographic order on
/// the stored text equals chronological order.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a message to the projection preview length
///
/// Applies to summary rows only; stored message text is never truncated.
#[must_use]
pub fn truncate_preview(message: &str) -> String {
    message.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Schema-qualified table names, fixed at startup from deployment config
#[derive(Debug, Clone)]
pub struct Tables {
    /// Qualified `accounts` table name
    pub accounts: String,
    /// Qualified `messages` table name
    pub messages: String,
    /// Qualified `message_images` table name
    pub message_images: String,
    /// Qualified `conversations` table name
    pub conversations: String,
    /// Qualified `chat_groups` table name
    pub chat_groups: String,
    /// Qualified `group_members` table name
    pub group_members: String,
    /// Qualified `group_conversations` table name
    pub group_conversations: String,
}

impl Tables {
    /// Build qualified names for the given schema namespace
    #[must_use]
    pub fn new(schema: &str) -> Self {
        let qualify = |name: &str| {
            if schema.is_empty() {
                name.to_owned()
            } else {
                format!("{schema}.{name}")
            }
        };
        Self {
            accounts: qualify("accounts"),
            messages: qualify("messages"),
            message_images: qualify("message_images"),
            conversations: qualify("conversations"),
            chat_groups: qualify("chat_groups"),
            group_members: qualify("group_members"),
            group_conversations: qualify("group_conversations"),
        }
    }
}

/// Database handle shared across the service
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    tables: Tables,
}

impl Database {
    /// Connect and run idempotent migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration statement fails.
    pub async fn new(database_url: &str, schema: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains("mode=")
            && !database_url.contains(":memory:")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // An in-memory database exists per connection, so the pool must not
        // open a second one.
        let pool = if connection_options.contains(":memory:") {
            sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&connection_options)
                .await?
        } else {
            SqlitePool::connect(&connection_options).await?
        };

        let db = Self {
            pool,
            tables: Tables::new(schema),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Qualified table names
    #[must_use]
    pub const fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Direct message store operations
    #[must_use]
    pub fn messages(&self) -> MessageManager {
        MessageManager::new(self.clone())
    }

    /// Conversation projection + read-state operations
    #[must_use]
    pub fn conversations(&self) -> ConversationManager {
        ConversationManager::new(self.clone())
    }

    /// Group membership operations
    #[must_use]
    pub fn groups(&self) -> GroupManager {
        GroupManager::new(self.clone())
    }

    /// Group message operations
    #[must_use]
    pub fn group_messages(&self) -> GroupMessageManager {
        GroupMessageManager::new(self.clone())
    }

    /// Run idempotent migrations
    ///
    /// Migrations execute against the connection's default schema; the
    /// configured namespace only qualifies names at query time.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        // Accounts directory is owned by the external identity system; the
        // table exists here so joins and local development work standalone.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                account TEXT PRIMARY KEY,
                description TEXT,
                customer_id TEXT,
                profile_image_url TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT PRIMARY KEY,
                sender_account TEXT NOT NULL,
                receiver_account TEXT,
                group_id TEXT,
                is_group_message BOOLEAN NOT NULL DEFAULT 0,
                message TEXT NOT NULL DEFAULT '',
                message_type TEXT NOT NULL DEFAULT 'text',
                image_url TEXT,
                thumbnail_url TEXT,
                image_count INTEGER NOT NULL DEFAULT 0,
                reply_to_message_id TEXT,
                timestamp TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT 0,
                read_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_direct_pair
             ON messages (sender_account, receiver_account, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_group
             ON messages (group_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS message_images (
                image_id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                image_url TEXT NOT NULL,
                thumbnail_url TEXT,
                image_order INTEGER NOT NULL,
                UNIQUE (message_id, image_order)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT NOT NULL,
                user_account TEXT NOT NULL,
                contact_account TEXT NOT NULL,
                last_message TEXT NOT NULL DEFAULT '',
                last_message_time TEXT,
                unread_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_account, contact_account)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_groups (
                group_id TEXT PRIMARY KEY,
                group_name TEXT NOT NULL,
                group_description TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS group_members (
                member_id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                user_account TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                joined_at TEXT NOT NULL,
                last_read_message_id TEXT,
                UNIQUE (group_id, user_account)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS group_conversations (
                conversation_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                user_account TEXT NOT NULL,
                last_message TEXT NOT NULL DEFAULT '',
                last_message_time TEXT,
                unread_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (group_id, user_account)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
