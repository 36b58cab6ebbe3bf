// ABOUTME: RAII transaction guard for multi-statement grant writes
// ABOUTME: Rolls back automatically when dropped without an explicit commit

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Transaction management with an RAII guard
//!
//! A grant writes a session, tokens, and their scope rows together. The guard
//! makes sure none of those rows become visible unless every statement
//! succeeded:
//!
//! ```text
//! let mut guard = TransactionGuard::new(pool.begin().await?);
//! sqlx::query("INSERT INTO oauth_sessions ...").execute(guard.executor()?).await?;
//! sqlx::query("INSERT INTO oauth_access_tokens ...").execute(guard.executor()?).await?;
//! guard.commit().await?;
//! ```

use scopegate_core::errors::DatabaseError;
use sqlx::{Database, Transaction};
use tracing::{debug, warn};

use crate::database_plugins::StoreResult;

/// RAII guard for database transactions ensuring automatic rollback on drop
///
/// If an error occurs before `commit()`, the guard is dropped and `SQLx`
/// rolls the transaction back.
pub struct TransactionGuard<'c, DB: Database> {
    transaction: Option<Transaction<'c, DB>>,
    committed: bool,
}

impl<'c, DB: Database> TransactionGuard<'c, DB> {
    /// Wrap a transaction obtained from `pool.begin().await`
    #[must_use]
    pub fn new(transaction: Transaction<'c, DB>) -> Self {
        debug!("TransactionGuard created - transaction will auto-rollback if not committed");
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Commit the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed or the commit fails
    pub async fn commit(mut self) -> StoreResult<()> {
        let tx = self.transaction.take().ok_or_else(|| DatabaseError::QueryError {
            context: "Transaction already consumed - cannot commit".to_owned(),
        })?;
        tx.commit().await.map_err(|e| DatabaseError::QueryError {
            context: format!("Transaction commit failed: {e}"),
        })?;
        self.committed = true;
        debug!("TransactionGuard committed successfully");
        Ok(())
    }

    /// Roll the transaction back explicitly and consume the guard
    ///
    /// Used when a conditional write found nothing to do; dropping the guard
    /// would roll back too, but this path avoids the warning log.
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed or the rollback fails
    pub async fn rollback(mut self) -> StoreResult<()> {
        let tx = self.transaction.take().ok_or_else(|| DatabaseError::QueryError {
            context: "Transaction already consumed - cannot rollback".to_owned(),
        })?;
        tx.rollback().await.map_err(|e| DatabaseError::QueryError {
            context: format!("Transaction rollback failed: {e}"),
        })?;
        debug!("TransactionGuard rolled back explicitly");
        Ok(())
    }

    /// Connection to execute statements on within the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already committed or rolled back
    pub fn executor(&mut self) -> StoreResult<&mut <DB as Database>::Connection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| DatabaseError::QueryError {
                context: "Transaction already consumed - guard used after commit/rollback"
                    .to_owned(),
            })
    }
}

impl<DB: Database> Drop for TransactionGuard<'_, DB> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            warn!(
                "TransactionGuard dropped without commit - transaction will be rolled back automatically"
            );
        }
    }
}

/// `SQLite` transaction guard
pub type SqliteTransactionGuard<'c> = TransactionGuard<'c, sqlx::Sqlite>;
