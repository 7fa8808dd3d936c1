// ABOUTME: Group membership manager - creation, member add/remove, creator invariants
// ABOUTME: Initializes and tears down per-member group conversation projections atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group membership management
//!
//! Membership transitions are absent -> member/admin -> absent. The creator
//! is inserted as admin at creation and can never be removed or leave; every
//! membership change keeps the per-member projection row in lockstep inside
//! the same transaction.

use crate::database::{now_timestamp, Database, TransactionGuard};
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::models::{roles, GroupDetails, GroupMemberRecord, GroupRecord, UserGroup};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

fn group_from_row(row: &SqliteRow) -> AppResult<GroupRecord> {
    Ok(GroupRecord {
        group_id: row.try_get("group_id")?,
        group_name: row.try_get("group_name")?,
        group_description: row.try_get("group_description")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_member(
    conn: &mut SqliteConnection,
    group_members_table: &str,
    group_id: &str,
    account: &str,
    role: &str,
    joined_at: &str,
) -> AppResult<()> {
    sqlx::query(&format!(
        r"
        INSERT INTO {group_members} (member_id, group_id, user_account, role, joined_at)
        VALUES ($1, $2, $3, $4, $5)
        ",
        group_members = group_members_table
    ))
    .bind(ids::group_member_id())
    .bind(group_id)
    .bind(account)
    .bind(role)
    .bind(joined_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn init_member_projection(
    conn: &mut SqliteConnection,
    group_conversations_table: &str,
    group_id: &str,
    account: &str,
    at: &str,
) -> AppResult<()> {
    sqlx::query(&format!(
        r"
        INSERT INTO {group_conversations} (
            conversation_id, group_id, user_account,
            last_message, last_message_time, unread_count, updated_at
        )
        VALUES ($1, $2, $3, '', $4, 0, $4)
        ",
        group_conversations = group_conversations_table
    ))
    .bind(ids::group_conversation_id())
    .bind(group_id)
    .bind(account)
    .bind(at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Group membership operations
pub struct GroupManager {
    db: Database,
}

impl GroupManager {
    /// Create a manager over the shared database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a group with its creator as admin and the listed invitees
    ///
    /// Every member (creator included) gets a projection row initialized at
    /// zero unread. Either the whole group + members + projections set is
    /// created, or none of it.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing persists then.
    pub async fn create_group(
        &self,
        group_name: &str,
        created_by: &str,
        description: Option<&str>,
        member_accounts: &[String],
    ) -> AppResult<GroupRecord> {
        let tables = self.db.tables().clone();
        let group_id = ids::group_id();
        let created_at = now_timestamp();

        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {chat_groups} (
                group_id, group_name, group_description,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            ",
            chat_groups = tables.chat_groups
        ))
        .bind(&group_id)
        .bind(group_name)
        .bind(description)
        .bind(created_by)
        .bind(&created_at)
        .execute(guard.executor()?)
        .await?;

        insert_member(
            guard.executor()?,
            &tables.group_members,
            &group_id,
            created_by,
            roles::ADMIN,
            &created_at,
        )
        .await?;

        let mut all_members = vec![created_by.to_owned()];
        for account in member_accounts {
            if account != created_by && !all_members.contains(account) {
                insert_member(
                    guard.executor()?,
                    &tables.group_members,
                    &group_id,
                    account,
                    roles::MEMBER,
                    &created_at,
                )
                .await?;
                all_members.push(account.clone());
            }
        }

        for account in &all_members {
            init_member_projection(
                guard.executor()?,
                &tables.group_conversations,
                &group_id,
                account,
                &created_at,
            )
            .await?;
        }

        guard.commit().await?;

        Ok(GroupRecord {
            group_id,
            group_name: group_name.to_owned(),
            group_description: description.map(ToOwned::to_owned),
            created_by: created_by.to_owned(),
            created_at: created_at.clone(),
            updated_at: created_at,
        })
    }

    /// List the groups a user belongs to, most recently active first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn user_groups(&self, account: &str) -> AppResult<Vec<UserGroup>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                g.group_id, g.group_name, g.group_description,
                g.created_by, g.created_at, g.updated_at,
                gm.role, gm.joined_at,
                gc.last_message, gc.last_message_time, gc.unread_count,
                (SELECT COUNT(*) FROM {group_members}
                 WHERE group_id = g.group_id) AS member_count
            FROM {chat_groups} g
            JOIN {group_members} gm ON g.group_id = gm.group_id
            LEFT JOIN {group_conversations} gc
              ON g.group_id = gc.group_id AND gc.user_account = $1
            WHERE gm.user_account = $1
            ORDER BY COALESCE(gc.updated_at, g.updated_at) DESC
            ",
            chat_groups = tables.chat_groups,
            group_members = tables.group_members,
            group_conversations = tables.group_conversations
        ))
        .bind(account)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(UserGroup {
                    group: group_from_row(row)?,
                    role: row.try_get("role")?,
                    joined_at: row.try_get("joined_at")?,
                    last_message: row.try_get("last_message")?,
                    last_message_time: row.try_get("last_message_time")?,
                    unread_count: row.try_get::<Option<i64>, _>("unread_count")?.unwrap_or(0),
                    member_count: row.try_get("member_count")?,
                })
            })
            .collect()
    }

    /// Group details with creator name and member count
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown group.
    pub async fn group_details(&self, group_id: &str) -> AppResult<GroupDetails> {
        let tables = self.db.tables();
        let row = sqlx::query(&format!(
            r"
            SELECT
                g.group_id, g.group_name, g.group_description,
                g.created_by, g.created_at, g.updated_at,
                u.description AS creator_name,
                (SELECT COUNT(*) FROM {group_members}
                 WHERE group_id = g.group_id) AS member_count
            FROM {chat_groups} g
            LEFT JOIN {accounts} u ON g.created_by = u.account
            WHERE g.group_id = $1
            ",
            chat_groups = tables.chat_groups,
            group_members = tables.group_members,
            accounts = tables.accounts
        ))
        .bind(group_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Group"))?;

        Ok(GroupDetails {
            group: group_from_row(&row)?,
            creator_name: row.try_get("creator_name")?,
            member_count: row.try_get("member_count")?,
        })
    }

    /// Group member list: admins first, then by join time
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn group_members(&self, group_id: &str) -> AppResult<Vec<GroupMemberRecord>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                gm.member_id, gm.group_id, gm.user_account, gm.role,
                gm.joined_at, gm.last_read_message_id,
                u.description AS member_name
            FROM {group_members} gm
            LEFT JOIN {accounts} u ON gm.user_account = u.account
            WHERE gm.group_id = $1
            ORDER BY
                CASE WHEN gm.role = 'admin' THEN 0 ELSE 1 END,
                gm.joined_at ASC
            ",
            group_members = tables.group_members,
            accounts = tables.accounts
        ))
        .bind(group_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GroupMemberRecord {
                    member_id: row.try_get("member_id")?,
                    group_id: row.try_get("group_id")?,
                    user_account: row.try_get("user_account")?,
                    role: row.try_get("role")?,
                    joined_at: row.try_get("joined_at")?,
                    last_read_message_id: row.try_get("last_read_message_id")?,
                    member_name: row.try_get("member_name")?,
                })
            })
            .collect()
    }

    /// Add a member to a group with a fresh projection row
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown group and
    /// `ResourceAlreadyExists` if the account is already a member.
    pub async fn add_member(&self, group_id: &str, account: &str, role: &str) -> AppResult<()> {
        let tables = self.db.tables().clone();
        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        let group_exists = sqlx::query(&format!(
            "SELECT group_id FROM {chat_groups} WHERE group_id = $1",
            chat_groups = tables.chat_groups
        ))
        .bind(group_id)
        .fetch_optional(guard.executor()?)
        .await?
        .is_some();
        if !group_exists {
            return Err(AppError::not_found("Group"));
        }

        let already_member = sqlx::query(&format!(
            "SELECT member_id FROM {group_members} WHERE group_id = $1 AND user_account = $2",
            group_members = tables.group_members
        ))
        .bind(group_id)
        .bind(account)
        .fetch_optional(guard.executor()?)
        .await?
        .is_some();
        if already_member {
            return Err(AppError::conflict("User is already a group member"));
        }

        let joined_at = now_timestamp();
        insert_member(
            guard.executor()?,
            &tables.group_members,
            group_id,
            account,
            role,
            &joined_at,
        )
        .await?;
        init_member_projection(
            guard.executor()?,
            &tables.group_conversations,
            group_id,
            account,
            &joined_at,
        )
        .await?;

        guard.commit().await
    }

    /// Remove a member (or let them leave), deleting their projection row
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the target is the group's creator,
    /// `ResourceNotFound` for an unknown group or a non-member.
    pub async fn remove_member(&self, group_id: &str, account: &str) -> AppResult<()> {
        let tables = self.db.tables().clone();
        let mut guard = TransactionGuard::begin(self.db.pool()).await?;

        let created_by: String = sqlx::query(&format!(
            "SELECT created_by FROM {chat_groups} WHERE group_id = $1",
            chat_groups = tables.chat_groups
        ))
        .bind(group_id)
        .fetch_optional(guard.executor()?)
        .await?
        .ok_or_else(|| AppError::not_found("Group"))?
        .try_get("created_by")?;

        if created_by == account {
            return Err(AppError::permission_denied(
                "The group creator cannot be removed from the group",
            ));
        }

        let deleted = sqlx::query(&format!(
            "DELETE FROM {group_members} WHERE group_id = $1 AND user_account = $2",
            group_members = tables.group_members
        ))
        .bind(group_id)
        .bind(account)
        .execute(guard.executor()?)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(AppError::not_found("Group member"));
        }

        sqlx::query(&format!(
            "DELETE FROM {group_conversations} WHERE group_id = $1 AND user_account = $2",
            group_conversations = tables.group_conversations
        ))
        .bind(group_id)
        .bind(account)
        .execute(guard.executor()?)
        .await?;

        guard.commit().await
    }

    /// Partial update of group name and/or description
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when neither field is given, `ResourceNotFound`
    /// for an unknown group.
    pub async fn update_info(
        &self,
        group_id: &str,
        group_name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<()> {
        if group_name.is_none() && description.is_none() {
            return Err(AppError::invalid_input("No fields to update"));
        }

        let tables = self.db.tables();
        let mut set_clauses = Vec::new();
        if group_name.is_some() {
            set_clauses.push("group_name = $1");
        }
        if description.is_some() {
            set_clauses.push(if group_name.is_some() {
                "group_description = $2"
            } else {
                "group_description = $1"
            });
        }
        set_clauses.push("updated_at = $4");

        let sql = format!(
            "UPDATE {chat_groups} SET {set_list} WHERE group_id = $3",
            chat_groups = tables.chat_groups,
            set_list = set_clauses.join(", ")
        );

        // Unused binds are harmless; positions stay fixed so the clause list
        // above can vary.
        let updated = sqlx::query(&sql)
            .bind(group_name.or(description))
            .bind(description)
            .bind(group_id)
            .bind(now_timestamp())
            .execute(self.db.pool())
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::not_found("Group"));
        }
        Ok(())
    }

    /// Case-insensitive group-name search, capped at 50 results
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search(&self, keyword: &str) -> AppResult<Vec<GroupDetails>> {
        let tables = self.db.tables();
        let rows = sqlx::query(&format!(
            r"
            SELECT
                g.group_id, g.group_name, g.group_description,
                g.created_by, g.created_at, g.updated_at,
                NULL AS creator_name,
                (SELECT COUNT(*) FROM {group_members}
                 WHERE group_id = g.group_id) AS member_count
            FROM {chat_groups} g
            WHERE g.group_name LIKE $1
            ORDER BY g.updated_at DESC
            LIMIT 50
            ",
            chat_groups = tables.chat_groups,
            group_members = tables.group_members
        ))
        .bind(format!("%{keyword}%"))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GroupDetails {
                    group: group_from_row(row)?,
                    creator_name: row.try_get("creator_name")?,
                    member_count: row.try_get("member_count")?,
                })
            })
            .collect()
    }

    /// Total unread group messages across all of a user's memberships
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn unread_total(&self, account: &str) -> AppResult<i64> {
        let row = sqlx::query(&format!(
            r"
            SELECT COALESCE(SUM(unread_count), 0) AS total_unread
            FROM {group_conversations}
            WHERE user_account = $1
            ",
            group_conversations = self.db.tables().group_conversations
        ))
        .bind(account)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.try_get("total_unread")?)
    }
}
