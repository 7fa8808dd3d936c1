// ABOUTME: RAII transaction guard ensuring automatic rollback when a mutation fails
// ABOUTME: Every multi-statement write in the messaging core runs under one guard
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction orchestration
//!
//! Every operation touching more than one of {message, message image,
//! conversation, group conversation, group member} acquires one transaction
//! and runs all statements under a [`TransactionGuard`]: commit consumes the
//! guard, and dropping it without commit rolls the transaction back, so a
//! failed send never leaves a message without its projection rows (or the
//! reverse). No nested transactions, no savepoints.

use crate::errors::{AppError, AppResult};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, warn};

/// RAII guard over a sqlx transaction
///
/// ```text
/// let mut guard = TransactionGuard::begin(pool).await?;
/// sqlx::query("INSERT ...").execute(guard.executor()?).await?;
/// sqlx::query("UPDATE ...").execute(guard.executor()?).await?;
/// guard.commit().await?;
/// ```
///
/// If any statement errors, the `?` drops the guard and sqlx rolls the
/// transaction back.
pub struct TransactionGuard<'c> {
    transaction: Option<Transaction<'c, Sqlite>>,
    committed: bool,
}

impl<'c> TransactionGuard<'c> {
    /// Begin a transaction on the pool and wrap it
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be checked out or BEGIN fails.
    pub async fn begin(pool: &sqlx::SqlitePool) -> AppResult<TransactionGuard<'static>> {
        let transaction = pool.begin().await?;
        Ok(TransactionGuard {
            transaction: Some(transaction),
            committed: false,
        })
    }

    /// Wrap an already-started transaction
    #[must_use]
    pub fn new(transaction: Transaction<'c, Sqlite>) -> Self {
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Executor for statements inside the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already committed or rolled back.
    pub fn executor(&mut self) -> AppResult<&mut SqliteConnection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }

    /// Commit and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails or the guard was already consumed.
    pub async fn commit(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))?;
                self.committed = true;
                debug!("transaction committed");
                Ok(())
            }
            None => Err(AppError::internal("Transaction already consumed")),
        }
    }

    /// Roll back explicitly and consume the guard
    ///
    /// Dropping without commit also rolls back; this variant surfaces
    /// rollback errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails or the guard was already
    /// consumed.
    pub async fn rollback(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.rollback()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction rollback failed: {e}")))?;
                debug!("transaction rolled back");
                Ok(())
            }
            None => Err(AppError::internal("Transaction already consumed")),
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            // sqlx rolls the dropped transaction back; log it for visibility.
            warn!("transaction guard dropped without commit, rolling back");
        }
    }
}
