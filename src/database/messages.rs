// ABOUTME: Direct message store operations - sends, thread fetch, reply threading, image children
// ABOUTME: Each send inserts the message and updates both conversation projections in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct message operations
//!
//! Sends mint the message id and the canonical server timestamp, insert the
//! row(s), and apply the conversation projection updates, all inside one
//! transaction. Image URLs arrive here already uploaded; the blob store is
//! never called with a transaction open.

use crate::database::{conversations, now_timestamp, Database, TransactionGuard};
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::models::{message_types, MessageImageRecord, MessageRecord, ThreadMessage};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

/// Synthetic projection preview for captionless single-image sends
pub const IMAGE_PREVIEW: &str = "sent an image";

/// Receipt returned from every send: the id and canonical timestamp
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Generated message id (`msg_...`)
    pub message_id: String,
    /// Server-assigned send timestamp
    pub timestamp: String,
}

/// Projection preview for a multi-image send without a caption
#[must_use]
pub fn multi_image_preview(count: usize) -> String {
    format!("[{count} images]")
}

pub(crate) fn message_from_row(row: &SqliteRow) -> AppResult<MessageRecord> {
    Ok(MessageRecord {
        message_id: row.try_get("message_id")?,
        sender_account: row.try_get("sender_account")?,
        receiver_account: row.try_get("receiver_account")?,
        group_id: row.try_get("group_id")?,
        is_group_message: row.try_get("is_group_message")?,
        message: row.try_get("message")?,
        message_type: row.try_get("message_type")?,
        image_url: row.try_get("image_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        image_count: row.try_get("image_count")?,
        reply_to_message_id: row.try_get("reply_to_message_id")?,
        timestamp: row.try_get("timestamp")?,
        is_read: row.try_get("is_read")?,
        read_at: row.try_get("read_at")?,
    })
}

pub(crate) fn image_from_row(row: &SqliteRow) -> AppResult<MessageImageRecord> {
    Ok(MessageImageRecord {
        image_id: row.try_get("image_id")?,
        message_id: row.try_get("message_id")?,
        image_url: row.try_get("image_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        image_order: row.try_get("image_order")?,
    })
}

/// Fetch the child image rows for a message, in display order
pub(crate) async fn fetch_message_images(
    db: &Database,
    message_id: &str,
) -> AppResult<Vec<MessageImageRecord>> {
    let rows = sqlx::query(&format!(
        r"
        SELECT image_id, message_id, image_url, thumbnail_url, image_order
        FROM {message_images}
        WHERE message_id = $1
        ORDER BY image_order ASC
        ",
        message_images = db.tables().message_images
    ))
    .bind(message_id)
    .fetch_all(db.pool())
    .await?;

    rows.iter().map(image_from_row).collect()
}

/// Insert the child rows of a multi-image message
pub(crate) async fn insert_image_children(
    conn: &mut SqliteConnection,
    message_images_table: &str,
    message_id: &str,
    image_urls: &[String],
) -> AppResult<()> {
    for (index, url) in image_urls.iter().enumerate() {
        sqlx::query(&format!(
            r"
            INSERT INTO {message_images} (image_id, message_id, image_url, thumbnail_url, image_order)
            VALUES ($1, $2, $3, $4, $5)
            ",
            message_images = message_images_table
        ))
        .bind(ids::image_id(message_id, index))
        .bind(message_id)
        .bind(url)
        .bind(url)
        .bind(i64::try_from(index).map_err(|_| AppError::invalid_input("Too many images"))?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Direct message store operations
pub struct MessageManager {
    db: Database,
}

impl MessageManager {
    /// Create a manager over the shared database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Send a direct text message
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_text(
        &self,
        sender: &str,
        receiver: &str,
        message: &str,
        message_type: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, receiver_account,
                message, message_type, reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(receiver)
        .bind(message)
        .bind(message_type)
        .bind(reply_to)
        .bind(&timestamp)
        .execute(guard.executor()?)
        .await?;

        conversations::apply_direct_send(
            guard.executor()?,
            &tables,
            sender,
            receiver,
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

    /// Send a direct single-image message; `image_url` is already uploaded
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_image(
        &self,
        sender: &str,
        receiver: &str,
        image_url: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, receiver_account,
                message, message_type, image_url, thumbnail_url,
                reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, '', $4, $5, $6, $7, $8)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(receiver)
        .bind(message_types::IMAGE)
        .bind(image_url)
        .bind(image_url)
        .bind(reply_to)
        .bind(&timestamp)
        .execute(guard.executor()?)
        .await?;

        conversations::apply_direct_send(
            guard.executor()?,
            &tables,
            sender,
            receiver,
            IMAGE_PREVIEW,
            &timestamp,
        )
        .await?;

        guard.commit().await?;
        Ok(SendReceipt {
            message_id,
            timestamp,
        })
    }

    /// Send a direct multi-image message; `image_urls` are already uploaded
    ///
    /// The parent row carries the caption and the image count; one child row
    /// per image carries URL and display order. All inserts share the
    /// transaction with the projection updates.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; the whole send rolls back.
    pub async fn send_multi_image(
        &self,
        sender: &str,
        receiver: &str,
        image_urls: &[String],
        caption: &str,
        reply_to: Option<&str>,
    ) -> AppResult<SendReceipt> {
        let tables = self.db.tables().clone();
        let message_id = ids::message_id();
        let timestamp = now_timestamp();
        let display_message = if caption.is_empty() {
            multi_image_preview(image_urls.len())
        } else {
            caption.to_owned()
        };

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {messages} (
                message_id, sender_account, receiver_account,
                message, message_type, image_count, reply_to_message_id, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
            messages = tables.messages
        ))
        .bind(&message_id)
        .bind(sender)
        .bind(receiver)
        .bind(&display_message)
        .bind(message_types::MULTI_IMAGE)
        .bind(i64::try_from(image_urls.len()).unwrap_or(0))
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

        conversations::apply_direct_send(
            guard.executor()?,
            &tables,
            sender,
            receiver,
            &display_message,
            &timestamp,
        )
        .await?;

        guard.commit().await?;
        Ok(SendReceipt {
            message_id,
            timestamp,
        })
    }

    /// Fetch the full thread between two accounts, ascending by timestamp
    ///
    /// Each message carries its reply context (null fields when the
    /// replied-to message no longer exists) and its child images.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn get_thread(
        &self,
        account1: &str,
        account2: &str,
    ) -> AppResult<Vec<ThreadMessage>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                m.message_id, m.sender_account, m.receiver_account, m.group_id,
                m.is_group_message, m.message, m.message_type, m.image_url,
                m.thumbnail_url, m.image_count, m.reply_to_message_id,
                m.timestamp, m.is_read, m.read_at,
                rm.message AS reply_to_message,
                rm.sender_account AS reply_to_sender,
                ru.description AS reply_to_sender_name
            FROM {messages} m
            LEFT JOIN {messages} rm ON m.reply_to_message_id = rm.message_id
            LEFT JOIN {accounts} ru ON rm.sender_account = ru.account
            WHERE (m.sender_account = $1 AND m.receiver_account = $2)
               OR (m.sender_account = $2 AND m.receiver_account = $1)
            ORDER BY m.timestamp ASC
            ",
            messages = tables.messages,
            accounts = tables.accounts
        ))
        .bind(account1)
        .bind(account2)
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
                sender_name: None,
                reply_to_message: row.try_get("reply_to_message")?,
                reply_to_sender: row.try_get("reply_to_sender")?,
                reply_to_sender_name: row.try_get("reply_to_sender_name")?,
                images,
            });
        }
        Ok(thread)
    }

    /// List a message's image rows in display order
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_message_images(&self, message_id: &str) -> AppResult<Vec<MessageImageRecord>> {
        fetch_message_images(&self.db, message_id).await
    }
}
