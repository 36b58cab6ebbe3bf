// ABOUTME: SQLite row to model conversion helpers for the grant tables
// ABOUTME: Timestamps are stored as Unix milliseconds, ids as TEXT, scopes in ordered link tables

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Model <-> SQL row conversion helpers
//!
//! Every timestamp column holds Unix milliseconds so that expiry checks can be
//! written as plain integer comparisons inside `UPDATE ... WHERE` statements.

use chrono::{DateTime, Utc};
use scopegate_core::errors::DatabaseError;
use scopegate_core::models::{AccessToken, Agent, GrantType, RefreshToken, Session, SessionOwner};
use scopegate_core::scopes::ScopeSet;
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};
use tracing::warn;
use uuid::Uuid;

use crate::database_plugins::StoreResult;

/// Read a column, mapping decode failures to `DatabaseError::QueryError`
///
/// # Errors
///
/// Returns an error if the column is missing or has an incompatible type
pub fn column<'r, T>(row: &'r SqliteRow, name: &str) -> StoreResult<T>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name).map_err(|e| DatabaseError::QueryError {
        context: format!("Failed to get column '{name}': {e}"),
    })
}

/// Convert a timestamp to its stored form
#[must_use]
pub fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Convert a stored timestamp back to `DateTime<Utc>`
///
/// # Errors
///
/// Returns an error if the value is outside chrono's range
pub fn from_millis(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| DatabaseError::QueryError {
        context: format!("Timestamp out of range: {millis}"),
    })
}

/// Convert a nullable stored timestamp
///
/// # Errors
///
/// Returns an error if the value is outside chrono's range
pub fn optional_millis(millis: Option<i64>) -> StoreResult<Option<DateTime<Utc>>> {
    millis.map(from_millis).transpose()
}

/// Parse a stored UUID
///
/// # Errors
///
/// Returns an error if the text is not a UUID
pub fn parse_uuid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::QueryError {
        context: format!("Invalid UUID '{value}': {e}"),
    })
}

/// Parse stored grant type identifiers, skipping unknown values
#[must_use]
pub fn parse_grant_types(values: Vec<String>) -> Vec<GrantType> {
    values
        .into_iter()
        .filter_map(|value| match value.parse() {
            Ok(grant_type) => Some(grant_type),
            Err(_) => {
                warn!("Ignoring unknown grant type in storage: {}", value);
                None
            }
        })
        .collect()
}

/// Build an `Agent` from an `agents` row; scopes are loaded separately
///
/// # Errors
///
/// Returns an error if a column is missing or malformed
pub fn agent_from_row(row: &SqliteRow, scopes: ScopeSet) -> StoreResult<Agent> {
    let id: String = column(row, "id")?;
    Ok(Agent {
        id: parse_uuid(&id)?,
        username: column(row, "username")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        scopes,
        password_reset_token_hash: column(row, "password_reset_token_hash")?,
        created_at: from_millis(column(row, "created_at")?)?,
    })
}

/// Build a `Session` from an `oauth_sessions` row; scopes are loaded separately
///
/// # Errors
///
/// Returns an error if a column is missing or malformed
pub fn session_from_row(row: &SqliteRow, scopes: ScopeSet) -> StoreResult<Session> {
    let id: String = column(row, "id")?;
    let owner_type: String = column(row, "owner_type")?;
    let owner_type = owner_type.parse().map_err(|_| DatabaseError::QueryError {
        context: format!("Unknown session owner type '{owner_type}'"),
    })?;
    Ok(Session {
        id: parse_uuid(&id)?,
        owner: SessionOwner {
            owner_type,
            owner_id: column(row, "owner_id")?,
        },
        client_id: column(row, "client_id")?,
        scopes,
        created_at: from_millis(column(row, "created_at")?)?,
    })
}

/// Build an `AccessToken` from an `oauth_access_tokens` row; scopes are loaded separately
///
/// # Errors
///
/// Returns an error if a column is missing or malformed
pub fn access_token_from_row(row: &SqliteRow, scopes: ScopeSet) -> StoreResult<AccessToken> {
    let session_id: String = column(row, "session_id")?;
    Ok(AccessToken {
        id: column(row, "id")?,
        session_id: parse_uuid(&session_id)?,
        scopes,
        expire_time: from_millis(column(row, "expire_time")?)?,
        revoked_at: optional_millis(column(row, "revoked_at")?)?,
        created_at: from_millis(column(row, "created_at")?)?,
    })
}

/// Build a `RefreshToken` from an `oauth_refresh_tokens` row
///
/// # Errors
///
/// Returns an error if a column is missing or malformed
pub fn refresh_token_from_row(row: &SqliteRow) -> StoreResult<RefreshToken> {
    Ok(RefreshToken {
        id: column(row, "id")?,
        access_token_id: column(row, "access_token_id")?,
        expire_time: from_millis(column(row, "expire_time")?)?,
        revoked_at: optional_millis(column(row, "revoked_at")?)?,
        created_at: from_millis(column(row, "created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip_truncates_to_milliseconds() {
        let now = Utc::now();
        let restored = from_millis(to_millis(now)).unwrap();
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_unknown_grant_types_are_skipped() {
        let parsed = parse_grant_types(vec![
            "password".to_owned(),
            "implicit".to_owned(),
            "refresh_token".to_owned(),
        ]);
        assert_eq!(parsed, vec![GrantType::Password, GrantType::RefreshToken]);
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid").is_err());
    }
}
