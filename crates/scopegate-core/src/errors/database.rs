// ABOUTME: Storage error type shared by the in-memory and SQLite backends
// ABOUTME: Converts sqlx errors into structured variants when the database-errors feature is on
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Errors raised by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// A row that must exist was not found
    #[error("{entity_type} '{entity_id}' not found")]
    NotFound {
        /// Kind of record that was looked up
        entity_type: &'static str,
        /// Identifier used for the lookup
        entity_id: String,
    },

    /// An insert collided with an existing primary key
    #[error("Duplicate {entity_type}: {entity_id}")]
    Duplicate {
        /// Kind of record being inserted
        entity_type: &'static str,
        /// Identifier that collided
        entity_id: String,
    },

    /// A query failed
    #[error("Query failed: {context}")]
    QueryError {
        /// Description of the failing query
        context: String,
    },

    /// The connection pool or underlying connection failed
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Schema creation failed
    #[error("Database migration failed: {0}")]
    MigrationError(String),
}

#[cfg(feature = "database-errors")]
use sqlx::Error as SqlxError;

#[cfg(feature = "database-errors")]
impl From<SqlxError> for DatabaseError {
    fn from(error: SqlxError) -> Self {
        match &error {
            SqlxError::RowNotFound => Self::NotFound {
                entity_type: "row",
                entity_id: String::new(),
            },
            SqlxError::Database(db_error) if db_error.is_unique_violation() => Self::Duplicate {
                entity_type: "record",
                entity_id: db_error.message().to_owned(),
            },
            SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Configuration(_) => Self::ConnectionError(error.to_string()),
            _ => Self::QueryError {
                context: error.to_string(),
            },
        }
    }
}
