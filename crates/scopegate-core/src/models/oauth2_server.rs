// ABOUTME: OAuth 2.0 grant persistence models for clients, agents, scopes, sessions, and tokens
// ABOUTME: Used by the storage traits and the grant flow; sessions and tokens are immutable once saved
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::oauth::{
    GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN, OWNER_TYPE_CLIENT, OWNER_TYPE_USER,
};
use crate::errors::GrantError;
use crate::scopes::ScopeSet;

/// Grant types handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Resource owner password credentials grant
    Password,
    /// Refresh token grant
    RefreshToken,
}

impl GrantType {
    /// Wire identifier of the grant
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Password => GRANT_TYPE_PASSWORD,
            Self::RefreshToken => GRANT_TYPE_REFRESH_TOKEN,
        }
    }
}

impl FromStr for GrantType {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            GRANT_TYPE_PASSWORD => Ok(Self::Password),
            GRANT_TYPE_REFRESH_TOKEN => Ok(Self::RefreshToken),
            other => Err(GrantError::unsupported_grant_type(other)),
        }
    }
}

impl Display for GrantType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Registered OAuth 2.0 client
#[derive(Debug, Clone)]
pub struct Client {
    /// Public client identifier
    pub client_id: String,
    /// Argon2 PHC hash of the client secret
    pub secret_hash: String,
    /// Human-readable client name
    pub name: String,
    /// Scopes the client may request (enforced when clients are limited to scopes)
    pub scopes: ScopeSet,
    /// Grants the client may use (enforced when clients are limited to grants)
    pub grant_types: Vec<GrantType>,
    /// When this client was registered
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Create a client record from an already hashed secret
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        secret_hash: impl Into<String>,
        name: impl Into<String>,
        scopes: ScopeSet,
        grant_types: Vec<GrantType>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            secret_hash: secret_hash.into(),
            name: name.into(),
            scopes,
            grant_types,
            created_at: Utc::now(),
        }
    }

    /// Whether the client is registered for `grant_type`
    #[must_use]
    pub fn allows_grant(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }
}

/// Resource owner (user) account
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique agent id
    pub id: Uuid,
    /// Login name, unique when present
    pub username: Option<String>,
    /// Email address, unique when present
    pub email: Option<String>,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// Scopes this agent may be granted
    pub scopes: ScopeSet,
    /// SHA-256 hex digest of an outstanding password reset token
    pub password_reset_token_hash: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new agent with a fresh id
    #[must_use]
    pub fn new(
        username: Option<String>,
        email: Option<String>,
        password_hash: String,
        scopes: ScopeSet,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            scopes,
            password_reset_token_hash: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this agent matches every identifier that was supplied
    ///
    /// Returns false when neither identifier is supplied.
    #[must_use]
    pub fn matches_identifiers(&self, username: Option<&str>, email: Option<&str>) -> bool {
        if username.is_none() && email.is_none() {
            return false;
        }
        let username_ok = username.is_none_or(|u| self.username.as_deref() == Some(u));
        let email_ok = email.is_none_or(|e| self.email.as_deref() == Some(e));
        username_ok && email_ok
    }
}

/// Scope definition
#[derive(Debug, Clone)]
pub struct Scope {
    /// Scope identifier as it appears in requests
    pub id: String,
    /// Human-readable description
    pub description: String,
    /// Grants registered for this scope (enforced when scopes are limited to grants)
    pub grant_types: Vec<GrantType>,
}

impl Scope {
    /// Create a scope with no grant registrations
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            grant_types: Vec::new(),
        }
    }

    /// Whether the scope is registered for `grant_type`
    #[must_use]
    pub fn allows_grant(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }
}

/// Kind of entity that owns a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    /// A resource owner (agent)
    User,
    /// A client acting on its own behalf
    Client,
}

impl OwnerType {
    /// Stored identifier of the owner type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => OWNER_TYPE_USER,
            Self::Client => OWNER_TYPE_CLIENT,
        }
    }
}

impl FromStr for OwnerType {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            OWNER_TYPE_USER => Ok(Self::User),
            OWNER_TYPE_CLIENT => Ok(Self::Client),
            other => Err(GrantError::internal(format!("unknown owner type: {other}"))),
        }
    }
}

/// Owner of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionOwner {
    /// Owner kind
    pub owner_type: OwnerType,
    /// Agent id or client id, depending on `owner_type`
    pub owner_id: String,
}

impl SessionOwner {
    /// Session owned by an agent
    #[must_use]
    pub fn user(agent_id: Uuid) -> Self {
        Self {
            owner_type: OwnerType::User,
            owner_id: agent_id.to_string(),
        }
    }

    /// Session owned by a client
    #[must_use]
    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            owner_type: OwnerType::Client,
            owner_id: client_id.into(),
        }
    }
}

/// Binding of an owner to a client with a set of scopes
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session id
    pub id: Uuid,
    /// Who owns the session
    pub owner: SessionOwner,
    /// Client the session was created for
    pub client_id: String,
    /// Scopes associated with the session
    pub scopes: ScopeSet,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with a fresh id, created now
    #[must_use]
    pub fn new(owner: SessionOwner, client_id: impl Into<String>, scopes: ScopeSet) -> Self {
        Self::new_at(owner, client_id, scopes, Utc::now())
    }

    /// Create a new session with a fresh id, created at `now`
    #[must_use]
    pub fn new_at(
        owner: SessionOwner,
        client_id: impl Into<String>,
        scopes: ScopeSet,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            client_id: client_id.into(),
            scopes,
            created_at: now,
        }
    }
}

/// Bearer access token record
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Opaque token id handed to the client
    pub id: String,
    /// Session the token belongs to
    pub session_id: Uuid,
    /// Scopes carried by the token (always a subset of the session scopes)
    pub scopes: ScopeSet,
    /// Absolute expiry; the token is rejected from this instant on
    pub expire_time: DateTime<Utc>,
    /// When the token was revoked (logout, rotation, or session revocation)
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is past its expiry at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_time
    }

    /// Whether the token is accepted at `now`
    ///
    /// A revoked token is rejected whatever `now` is.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && !self.is_expired_at(now)
    }

    /// Whole seconds left at `now`, never negative
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expire_time - now).num_seconds().max(0)
    }
}

/// Refresh token record
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Opaque token id handed to the client
    pub id: String,
    /// Access token this refresh token was issued with
    pub access_token_id: String,
    /// Absolute expiry; the token is rejected from this instant on
    pub expire_time: DateTime<Utc>,
    /// When the token was consumed by a rotation or revoked
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Whether the token is past its expiry at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_time
    }

    /// Whether the token may still be redeemed at `now`
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && !self.is_expired_at(now)
    }
}
