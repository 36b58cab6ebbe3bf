// ABOUTME: Storage abstraction for the grant engine: one capability trait per collaborator
// ABOUTME: In-memory and SQLite backends implement every trait; GrantStores bundles them for injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scopegate_core::errors::DatabaseError;
use scopegate_core::models::{
    AccessToken, Agent, Client, GrantType, RefreshToken, Scope, Session, SessionOwner,
};
use scopegate_core::scopes::ScopeSet;
use uuid::Uuid;

/// In-memory backend for tests and embedding
pub mod memory;
/// Shared backend utilities
pub mod shared;
/// `SQLite` backend
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, DatabaseError>;

/// Lookup restrictions a backend enforces while resolving clients and scopes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreRestrictions {
    /// Client lookups fail unless the client is registered for the grant
    pub limit_clients_to_grants: bool,
    /// Scope lookups fail unless the client is registered for the scope
    pub limit_clients_to_scopes: bool,
    /// Scope lookups fail unless the scope is registered for the grant
    pub limit_scopes_to_grants: bool,
}

/// Atomic write set for a refresh token grant
#[derive(Debug, Clone)]
pub struct RefreshRotation {
    /// Refresh token presented by the client
    pub old_refresh_token_id: String,
    /// Access token the presented refresh token was issued with
    pub old_access_token_id: String,
    /// Newly minted access token
    pub new_access_token: AccessToken,
    /// Replacement refresh token; `None` keeps the presented one alive
    pub new_refresh_token: Option<RefreshToken>,
}

/// Client lookup and authentication
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Return the client when `client_secret` matches and the client may use `grant_type`
    ///
    /// Returns `Ok(None)` for an unknown client, a wrong secret, or a disallowed grant.
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: &str,
        grant_type: GrantType,
    ) -> StoreResult<Option<Client>>;
}

/// Resource owner accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the agent matching every supplied identifier
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<Agent>>;

    /// Check `password` against the agent's stored hash
    async fn check_password(&self, agent: &Agent, password: &str) -> bool;

    /// Scopes the agent may be granted
    async fn scopes_for(&self, agent: &Agent) -> StoreResult<ScopeSet>;

    /// Load an agent by id
    async fn get_agent(&self, agent_id: Uuid) -> StoreResult<Option<Agent>>;

    /// Replace the password hash if the stored reset token digest equals `token_digest`
    ///
    /// The digest is cleared by the same write, so a reset token changes the
    /// password at most once. Returns false for an unknown agent or a digest
    /// that no longer matches.
    async fn reset_password(
        &self,
        agent_id: Uuid,
        token_digest: &str,
        password_hash: &str,
    ) -> StoreResult<bool>;

    /// Store (or clear) the digest of a password reset token
    async fn set_password_reset_token(
        &self,
        agent_id: Uuid,
        token_digest: Option<&str>,
    ) -> StoreResult<()>;
}

/// Scope definitions
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Resolve a scope id for `grant_type`, honoring the backend's restrictions
    async fn get_scope(
        &self,
        scope_id: &str,
        grant_type: GrantType,
        client_id: Option<&str>,
    ) -> StoreResult<Option<Scope>>;
}

/// Session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session with its scopes
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>>;

    /// All sessions of an owner
    async fn sessions_for_owner(&self, owner: &SessionOwner) -> StoreResult<Vec<Session>>;
}

/// Access token records and the atomic grant write sets
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load an access token with its scopes
    async fn get_access_token(&self, token_id: &str) -> StoreResult<Option<AccessToken>>;

    /// Revoke an access token at `at`; an earlier revocation instant is kept
    ///
    /// Returns false when the token does not exist.
    async fn expire_access_token(&self, token_id: &str, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Persist a session, its access token, and an optional refresh token in one unit
    async fn store_new_session(
        &self,
        session: &Session,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> StoreResult<()>;

    /// Apply a refresh grant in one unit
    ///
    /// Rotation marks the presented refresh token revoked; without rotation it
    /// stays redeemable. Returns `Ok(false)` and writes nothing when the
    /// presented token is already revoked (rotated away, revoked, or consumed
    /// by a concurrent request) or is past its expiry at `now`.
    async fn store_rotation(
        &self,
        rotation: &RefreshRotation,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Revoke every access and refresh token of every session owned by `owner`
    ///
    /// Returns the number of sessions affected.
    async fn revoke_sessions_for_owner(
        &self,
        owner: &SessionOwner,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

/// Refresh token records
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Load a refresh token
    async fn get_refresh_token(&self, token_id: &str) -> StoreResult<Option<RefreshToken>>;
}

/// Storage collaborators injected into the grant server
#[derive(Clone)]
pub struct GrantStores {
    /// Client lookups
    pub clients: Arc<dyn ClientStore>,
    /// Agent lookups and password checks
    pub users: Arc<dyn UserStore>,
    /// Scope lookups
    pub scopes: Arc<dyn ScopeStore>,
    /// Session lookups
    pub sessions: Arc<dyn SessionStore>,
    /// Access token persistence
    pub tokens: Arc<dyn TokenStore>,
    /// Refresh token persistence
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl GrantStores {
    /// Use one backend for every collaborator
    #[must_use]
    pub fn from_backend<B>(backend: &Arc<B>) -> Self
    where
        B: ClientStore
            + UserStore
            + ScopeStore
            + SessionStore
            + TokenStore
            + RefreshTokenStore
            + 'static,
    {
        Self {
            clients: backend.clone(), // Safe: Arc clone per collaborator
            users: backend.clone(),
            scopes: backend.clone(),
            sessions: backend.clone(),
            tokens: backend.clone(),
            refresh_tokens: backend.clone(),
        }
    }
}
