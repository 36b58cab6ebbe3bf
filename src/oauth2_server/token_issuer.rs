// ABOUTME: Mints access and refresh tokens with absolute expiry and persists grant write sets
// ABOUTME: Token ids are 256-bit random values; persistence is one atomic store call per grant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::{AccessToken, RefreshToken, Session};
use scopegate_core::scopes::ScopeSet;
use tracing::{debug, warn};

use crate::config::GrantServerConfig;
use crate::crypto::generate_token_id;
use crate::database_plugins::{RefreshRotation, TokenStore};
use crate::logging::redact_token;

/// Token lifetimes and refresh behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    /// Access token TTL for the password grant
    pub password_access_ttl: Duration,
    /// Access token TTL for the refresh grant
    pub refresh_access_ttl: Duration,
    /// Refresh token TTL
    pub refresh_ttl: Duration,
    /// Issue refresh tokens alongside password-grant access tokens
    pub issue_refresh_tokens: bool,
    /// Replace the refresh token on every refresh grant
    pub rotate_refresh_tokens: bool,
}

impl From<&GrantServerConfig> for TokenLifetimes {
    fn from(config: &GrantServerConfig) -> Self {
        Self {
            password_access_ttl: config.password_access_token_ttl(),
            refresh_access_ttl: config.refresh_access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
            issue_refresh_tokens: config.refresh_grant_enabled,
            rotate_refresh_tokens: config.rotate_refresh_tokens,
        }
    }
}

/// Creates and persists tokens
#[derive(Clone)]
pub struct TokenIssuer {
    tokens: Arc<dyn TokenStore>,
    lifetimes: TokenLifetimes,
}

impl TokenIssuer {
    /// Create an issuer persisting through `tokens`
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, lifetimes: TokenLifetimes) -> Self {
        Self { tokens, lifetimes }
    }

    /// Configured lifetimes
    #[must_use]
    pub const fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Mint an access token for `session` carrying `scopes`
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` if `scopes` is not a subset of the session scopes,
    /// or `Internal` if the RNG fails or the expiry overflows
    pub fn issue(
        &self,
        session: &Session,
        ttl: Duration,
        scopes: ScopeSet,
        now: DateTime<Utc>,
    ) -> GrantResult<AccessToken> {
        if let Some(scope) = scopes.first_outside(&session.scopes) {
            return Err(GrantError::invalid_scope(scope));
        }
        Ok(AccessToken {
            id: generate_token_id()?,
            session_id: session.id,
            scopes,
            expire_time: expiry(now, ttl)?,
            revoked_at: None,
            created_at: now,
        })
    }

    /// Mint a refresh token bound to `access_token`
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the RNG fails or the expiry overflows
    pub fn issue_refresh(
        &self,
        access_token: &AccessToken,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> GrantResult<RefreshToken> {
        Ok(RefreshToken {
            id: generate_token_id()?,
            access_token_id: access_token.id.clone(), // Safe: refresh token owns its link
            expire_time: expiry(now, ttl)?,
            revoked_at: None,
            created_at: now,
        })
    }

    /// Persist a new session with its first tokens in one unit
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the write fails; nothing is persisted in that case
    pub async fn persist_new_session(
        &self,
        session: &Session,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> GrantResult<()> {
        self.tokens
            .store_new_session(session, access_token, refresh_token)
            .await?;
        debug!(
            session_id = %session.id,
            access_token = %redact_token(&access_token.id),
            "Persisted new session"
        );
        Ok(())
    }

    /// Persist a refresh grant in one unit
    ///
    /// # Errors
    ///
    /// Returns `InvalidRefresh` if the presented refresh token stopped being
    /// active before the write (a concurrent refresh won), `Storage` if the write fails
    pub async fn persist_rotation(
        &self,
        rotation: &RefreshRotation,
        now: DateTime<Utc>,
    ) -> GrantResult<()> {
        if self.tokens.store_rotation(rotation, now).await? {
            return Ok(());
        }
        warn!(
            refresh_token = %redact_token(&rotation.old_refresh_token_id),
            "Refresh token was consumed before the grant could commit"
        );
        Err(GrantError::InvalidRefresh)
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> GrantResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| GrantError::internal("Token expiry out of range"))
}

#[cfg(test)]
mod tests {
    use scopegate_core::models::SessionOwner;
    use uuid::Uuid;

    use super::*;
    use crate::database_plugins::{InMemoryStore, StoreRestrictions};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(InMemoryStore::new(StoreRestrictions::default())),
            TokenLifetimes::from(&GrantServerConfig::default()),
        )
    }

    #[test]
    fn test_issue_sets_absolute_expiry_and_random_ids() {
        let issuer = issuer();
        let session = Session::new(
            SessionOwner::user(Uuid::new_v4()),
            "client1",
            ScopeSet::from_ids(["user"]),
        );
        let now = Utc::now();
        let first = issuer
            .issue(&session, Duration::seconds(60), session.scopes.clone(), now)
            .unwrap();
        let second = issuer
            .issue(&session, Duration::seconds(60), session.scopes.clone(), now)
            .unwrap();

        assert_eq!(first.expire_time, now + Duration::seconds(60));
        assert_eq!(first.id.len(), 43);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_issue_rejects_scopes_outside_session() {
        let issuer = issuer();
        let session = Session::new(
            SessionOwner::user(Uuid::new_v4()),
            "client1",
            ScopeSet::from_ids(["user"]),
        );
        let err = issuer
            .issue(
                &session,
                Duration::seconds(60),
                ScopeSet::from_ids(["user", "admin"]),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, GrantError::invalid_scope("admin"));
    }
}
