// ABOUTME: Group message manager - group sends, thread retrieval, group read-state
// ABOUTME: Every send fans out to member projections in the same transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group message management
//!
//! Sends insert the message row and update every current member's
//! conversation projection in one transaction; the sender's own unread
//! count is never incremented. Replies coerce the stored type to `reply`.

use crate::database::messages::{
    fetch_message_images, insert_image_children, message_from_row, multi_image_preview,
    SendReceipt, IMAGE_PREVIEW,
};
use crate::database::{conversations, now_timestamp, Database, TransactionGuard};
use crate::errors::AppResult;
use crate::ids;
use crate::models::{message_types, ThreadMessage};
use sqlx::Row;

/// Group message operations
pub struct GroupMessageManager {
    db: Database,
}

impl GroupMessageManager {
    /// Create a manager over the shared database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Send a group text message and fan out to member projections
    ///
    /// A reply id forces the stored type to `reply` regardless of the
    /// requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_text(
        &self,
        group_id: &str,
        sender: &str,
        message: &str,
        message_type: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();
        let stored_type = if reply_to.is_some() {
            message_types::REPLY
        } else {
            message_type
        };

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, group_id, is_group_message,
                message, message_type, reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, 1, $4, $5, $6, $7)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(group_id)
        .bind(message)
        .bind(stored_type)
        .bind(reply_to)
        .bind(&timestamp)
        .execute(guard.executor()?)
        .await?;

        conversations::apply_group_send(
            guard.executor()?,
            &tables,
            group_id,
            sender,
            message,
            &timestamp,
        )
        .await?;

        guard.commit().await?;
        Ok(SendReceipt {
            message_id,
            timestamp,
        })
    }

    /// Send a group single-image message; `image_url` is already uploaded
    ///
    /// The projection preview is the caption when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_image(
        &self,
        group_id: &str,
        sender: &str,
        image_url: &str,
        caption: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();
        let stored_type = if reply_to.is_some() {
            message_types::REPLY
        } else {
            message_types::IMAGE
        };
        let preview = if caption.is_empty() {
            IMAGE_PREVIEW
        } else {
            caption
        };

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, group_id, is_group_message,
                message, message_type, image_url, thumbnail_url,
                reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, 1, $4, $5, $6, $7, $8, $9)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(group_id)
        .bind(caption)
        .bind(stored_type)
        .bind(image_url)
        .bind(image_url)
        .bind(reply_to)
        .bind(&timestamp)
        .execute(guard.executor()?)
        .await?;

        conversations::apply_group_send(
            guard.executor()?,
            &tables,
            group_id,
            sender,
            preview,
            &timestamp,
        )
        .await?;

        guard.commit().await?;
        Ok(SendReceipt {
            message_id,
            timestamp,
        })
    }

    /// Send a group multi-image message; `image_urls` are already uploaded
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_multi_image(
        &self,
        group_id: &str,
        sender: &str,
        image_urls: &[String],
        caption: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();
        let display = if caption.is_empty() {
            multi_image_preview(image_urls.len())
        } else {
            caption.to_owned()
        };

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, group_id, is_group_message,
                message, message_type, image_count,
                reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, 1, $4, $5, $6, $7, $8)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(group_id)
        .bind(&display)
        .bind(message_types::MULTI_IMAGE)
        .bind(i64::try_from(image_urls.len()).unwrap_or(i64::MAX))
        .bind(reply_to)
        .bind(&timestamp)
        .execute(guard.executor()?)
        .await?;

        insert_image_children(
            guard.executor()?,
            &tables.message_images,
            &message_id,
            image_urls,
        )
        .await?;

        conversations::apply_group_send(
            guard.executor()?,
            &tables,
            group_id,
            sender,
            &display,
            &timestamp,
        )
        .await?;

        guard.commit().await?;
        Ok(SendReceipt {
            message_id,
            timestamp,
        })
    }

    /// Full group thread in chronological order with sender names, reply
    /// context and child images
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn get_thread(&self, group_id: &str) -> AppResult<Vec<ThreadMessage>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                m.message_id, m.sender_account, m.receiver_account, m.group_id,
                m.is_group_message, m.message, m.message_type, m.image_url,
                m.thumbnail_url, m.image_count, m.reply_to_message_id,
                m.timestamp, m.is_read, m.read_at,
                u.description AS sender_name,
                rm.message AS reply_to_message,
                rm.sender_account AS reply_to_sender,
                ru.description AS reply_to_sender_name
            FROM {messages} m
            LEFT JOIN {accounts} u ON m.sender_account = u.account
            LEFT JOIN {messages} rm ON m.reply_to_message_id = rm.message_id
            LEFT JOIN {accounts} ru ON rm.sender_account = ru.account
            WHERE m.group_id = $1 AND m.is_group_message = 1
            ORDER BY m.timestamp ASC
            ",
            messages = tables.messages,
            accounts = tables.accounts
        ))
        .bind(group_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut thread = Vec::with_capacity(rows.len());
        for row in &rows {
            let message = message_from_row(row)?;
            let images = if message.image_count > 0 {
                fetch_message_images(&self.db, &message.message_id).await?
            } else {
                Vec::new()
            };
            thread.push(ThreadMessage {
                message,
                sender_name: row.try_get("sender_name")?,
                reply_to_message: row.try_get("reply_to_message")?,
                reply_to_sender: row.try_get("reply_to_sender")?,
                reply_to_sender_name: row.try_get("reply_to_sender_name")?,
                images,
            });
        }
        Ok(thread)
    }

    /// Zero one member's unread counter for a group
    ///
    /// Idempotent; a second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_as_read(&self, group_id: &str, account: &str) -> AppResult<()> {
        sqlx::query(&format!(
            r"
            UPDATE {group_conversations}
            SET unread_count = 0, updated_at = $3
            WHERE group_id = $1 AND user_account = $2
            ",
            group_conversations = self.db.tables().group_conversations
        ))
        .bind(group_id)
        .bind(account)
        .bind(now_timestamp())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
