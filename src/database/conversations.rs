// ABOUTME: Conversation projection maintainer - last-message/unread summaries for direct and group chats
// ABOUTME: Read-state tracking and conversation lifecycle (list, delete, unread totals)
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summary maintenance
//!
//! The denormalized projection rows (one per ordered direct pair, one per
//! group member) are updated inside the same transaction as the triggering
//! message insert; the projection writers here take a transaction executor so
//! the message managers can compose them under one [`TransactionGuard`].
//! Counter bumps are atomic `unread_count + 1` inside the upsert; no
//! read-modify-write in application code, the database serializes conflicting
//! upserts on the unique key.

use crate::database::{now_timestamp, truncate_preview, Database, Tables, TransactionGuard};
use crate::errors::AppResult;
use crate::ids;
use crate::models::ConversationRecord;
use sqlx::{Row, SqliteConnection};

/// Apply a direct send to both projection rows of the (sender, receiver) pair
///
/// The sender's outgoing view keeps its unread count (inserted at 0); the
/// receiver's view increments by one. Must run in the same transaction as the
/// message insert.
pub(crate) async fn apply_direct_send(
    conn: &mut SqliteConnection,
    tables: &Tables,
    sender: &str,
    receiver: &str,
    message: &str,
    message_time: &str,
) -> AppResult<()> {
    let preview = truncate_preview(message);

    // Sender's view: refresh the preview, no unread contribution.
    sqlx::query(&format!(
        r"
        INSERT INTO {conversations} (
            conversation_id, user_account, contact_account,
            last_message, last_message_time, unread_count, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, 0, $6)
        ON CONFLICT (user_account, contact_account) DO UPDATE SET
            last_message = excluded.last_message,
            last_message_time = excluded.last_message_time,
            updated_at = excluded.updated_at
        ",
        conversations = tables.conversations
    ))
    .bind(ids::conversation_id(sender, receiver))
    .bind(sender)
    .bind(receiver)
    .bind(&preview)
    .bind(message_time)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await?;

    // Receiver's view: refresh the preview and bump the unread counter.
    sqlx::query(&format!(
        r"
        INSERT INTO {conversations} (
            conversation_id, user_account, contact_account,
            last_message, last_message_time, unread_count, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, 1, $6)
        ON CONFLICT (user_account, contact_account) DO UPDATE SET
            last_message = excluded.last_message,
            last_message_time = excluded.last_message_time,
            unread_count = unread_count + 1,
            updated_at = excluded.updated_at
        ",
        conversations = tables.conversations
    ))
    .bind(ids::conversation_id(receiver, sender))
    .bind(receiver)
    .bind(sender)
    .bind(&preview)
    .bind(message_time)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fan a group send out to every current member's projection row
///
/// Membership is read fresh inside the transaction; members removed before
/// the send get nothing, members added afterwards are unaffected. The
/// sender's own row takes the new preview without an unread increment.
pub(crate) async fn apply_group_send(
    conn: &mut SqliteConnection,
    tables: &Tables,
    group_id: &str,
    sender: &str,
    message: &str,
    message_time: &str,
) -> AppResult<()> {
    let preview = truncate_preview(message);

    let members: Vec<String> = sqlx::query(&format!(
        "SELECT user_account FROM {group_members} WHERE group_id = $1",
        group_members = tables.group_members
    ))
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| row.get::<String, _>("user_account"))
    .collect();

    for member in &members {
        let is_sender = member == sender;
        let increment = if is_sender {
            "updated_at = excluded.updated_at"
        } else {
            "unread_count = unread_count + 1,
            updated_at = excluded.updated_at"
        };
        sqlx::query(&format!(
            r"
            INSERT INTO {group_conversations} (
                conversation_id, group_id, user_account,
                last_message, last_message_time, unread_count, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (group_id, user_account) DO UPDATE SET
                last_message = excluded.last_message,
                last_message_time = excluded.last_message_time,
                {increment}
            ",
            group_conversations = tables.group_conversations
        ))
        .bind(ids::group_conversation_id())
        .bind(group_id)
        .bind(member)
        .bind(&preview)
        .bind(message_time)
        .bind(i64::from(!is_sender))
        .bind(message_time)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Conversation projection and read-state operations
pub struct ConversationManager {
    db: Database,
}

impl ConversationManager {
    /// Create a manager over the shared database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// List a user's direct conversations, most recent first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, account: &str) -> AppResult<Vec<ConversationRecord>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                c.conversation_id, c.user_account, c.contact_account,
                c.last_message, c.last_message_time, c.unread_count, c.updated_at,
                a.description AS contact_name
            FROM {conversations} c
            LEFT JOIN {accounts} a ON c.contact_account = a.account
            WHERE c.user_account = $1
            ORDER BY c.last_message_time DESC
            ",
            conversations = tables.conversations,
            accounts = tables.accounts
        ))
        .bind(account)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ConversationRecord {
                    conversation_id: row.try_get("conversation_id")?,
                    user_account: row.try_get("user_account")?,
                    contact_account: row.try_get("contact_account")?,
                    contact_name: row.try_get("contact_name")?,
                    last_message: row.try_get("last_message")?,
                    last_message_time: row.try_get("last_message_time")?,
                    unread_count: row.try_get("unread_count")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    /// Delete one user's view of a direct conversation and the pair's messages
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is deleted then.
    pub async fn delete(&self, user_account: &str, contact_account: &str) -> AppResult<()> {
        let tables = self.db.tables().clone();
        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            "DELETE FROM {conversations} WHERE user_account = $1 AND contact_account = $2",
            conversations = tables.conversations
        ))
        .bind(user_account)
        .bind(contact_account)
        .execute(guard.executor()?)
        .await?;

        sqlx::query(&format!(
            r"
            DELETE FROM {messages}
            WHERE (sender_account = $1 AND receiver_account = $2)
               OR (sender_account = $2 AND receiver_account = $1)
            ",
            messages = tables.messages
        ))
        .bind(user_account)
        .bind(contact_account)
        .execute(guard.executor()?)
        .await?;

        guard.commit().await
    }

    /// Mark all messages from `contact_account` to `user_account` as read and
    /// zero the user's unread counter
    ///
    /// Idempotent: re-invocation finds no unread messages and rewrites the
    /// counter to the zero it already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is updated then.
    pub async fn mark_as_read(&self, user_account: &str, contact_account: &str) -> AppResult<()> {
        let tables = self.db.tables().clone();
        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            UPDATE {messages}
            SET is_read = 1, read_at = $1
            WHERE receiver_account = $2
              AND sender_account = $3
              AND is_read = 0
            ",
            messages = tables.messages
        ))
        .bind(now_timestamp())
        .bind(user_account)
        .bind(contact_account)
        .execute(guard.executor()?)
        .await?;

        sqlx::query(&format!(
            r"
            UPDATE {conversations}
            SET unread_count = 0
            WHERE user_account = $1 AND contact_account = $2
            ",
            conversations = tables.conversations
        ))
        .bind(user_account)
        .bind(contact_account)
        .execute(guard.executor()?)
        .await?;

        guard.commit().await
    }

    /// Total unread direct messages across all of a user's conversations
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn unread_total(&self, account: &str) -> AppResult<i64> {
        let row = sqlx::query(&format!(
            r"
            SELECT COALESCE(SUM(unread_count), 0) AS total_unread
            FROM {conversations}
            WHERE user_account = $1
            ",
            conversations = self.db.tables().conversations
        ))
        .bind(account)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.try_get("total_unread")?)
    }
}
