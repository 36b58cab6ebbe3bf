// ABOUTME: Bearer access token validation and scope checks for resource access
// ABOUTME: Also enforces owner types, expires tokens on logout, and revokes every session of an owner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::{Agent, OwnerType, SessionOwner};
use scopegate_core::scopes::ScopeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventSink, GrantEvent};
use crate::database_plugins::{GrantStores, SessionStore, TokenStore, UserStore};
use crate::logging::redact_token;

/// Caller identified by a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAgent {
    /// Owner of the token's session
    pub owner: SessionOwner,
    /// Client the token was issued to
    pub client_id: String,
    /// Session the token belongs to
    pub session_id: Uuid,
    /// Access token id
    pub access_token_id: String,
    /// Scopes carried by the token
    pub scopes: ScopeSet,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedAgent {
    /// Agent id when the session is owned by a user
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self.owner.owner_type {
            OwnerType::User => Uuid::parse_str(&self.owner.owner_id).ok(),
            OwnerType::Client => None,
        }
    }

    /// Client id when the session is owned by a client
    #[must_use]
    pub fn owning_client_id(&self) -> Option<&str> {
        match self.owner.owner_type {
            OwnerType::Client => Some(&self.owner.owner_id),
            OwnerType::User => None,
        }
    }

    /// Whether the token carries `scope`
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Whether the token carries every scope in `required`
    #[must_use]
    pub fn has_all_scopes(&self, required: &[&str]) -> bool {
        self.scopes.has_all(required)
    }

    /// Whether the token satisfies any one of the requirement sets
    #[must_use]
    pub fn has_one_of_scopes(&self, requirement_sets: &[&[&str]]) -> bool {
        self.scopes.has_one_of(requirement_sets)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Guards resources behind bearer access tokens
#[derive(Clone)]
pub struct ResourceGuard {
    tokens: Arc<dyn TokenStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventSink>,
}

impl ResourceGuard {
    /// Create a guard over the grant stores
    #[must_use]
    pub fn new(stores: &GrantStores, events: Arc<dyn EventSink>) -> Self {
        Self {
            tokens: stores.tokens.clone(), // Safe: Arc clone
            sessions: stores.sessions.clone(),
            users: stores.users.clone(),
            events,
        }
    }

    /// Authenticate a bearer access token now
    ///
    /// # Errors
    ///
    /// `InvalidRequest("access_token")` when absent, `AccessDenied` when unknown or expired
    pub async fn authenticate(&self, bearer: Option<&str>) -> GrantResult<AuthenticatedAgent> {
        self.authenticate_at(bearer, Utc::now()).await
    }

    /// Authenticate a bearer access token at `now`
    ///
    /// # Errors
    ///
    /// `InvalidRequest("access_token")` when absent, `AccessDenied` when unknown,
    /// revoked, expired, or detached from its session
    pub async fn authenticate_at(
        &self,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> GrantResult<AuthenticatedAgent> {
        let token_id = bearer
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GrantError::invalid_request("access_token"))?;

        let Some(access_token) = self.tokens.get_access_token(token_id).await? else {
            debug!(access_token = %redact_token(token_id), "Unknown access token");
            return Err(GrantError::AccessDenied);
        };
        if !access_token.is_active_at(now) {
            debug!(
                access_token = %redact_token(token_id),
                revoked = access_token.revoked_at.is_some(),
                "Inactive access token"
            );
            return Err(GrantError::AccessDenied);
        }
        let Some(session) = self.sessions.get_session(access_token.session_id).await? else {
            warn!(access_token = %redact_token(token_id), "Access token without session");
            return Err(GrantError::AccessDenied);
        };

        Ok(AuthenticatedAgent {
            owner: session.owner,
            client_id: session.client_id,
            session_id: session.id,
            access_token_id: access_token.id,
            scopes: access_token.scopes,
            expires_at: access_token.expire_time,
        })
    }

    /// Require at least one of the requirement sets
    ///
    /// # Errors
    ///
    /// `AccessDenied` when no set is fully held
    pub fn require_one_of(
        agent: &AuthenticatedAgent,
        requirement_sets: &[&[&str]],
    ) -> GrantResult<()> {
        if agent.has_one_of_scopes(requirement_sets) {
            return Ok(());
        }
        debug!(
            client_id = %agent.client_id,
            scopes = %agent.scopes,
            "Access token lacks the required scopes"
        );
        Err(GrantError::AccessDenied)
    }

    /// Require a token issued to a client acting on its own behalf
    ///
    /// Returns the owning client id.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when a user owns the session
    pub fn require_client_owner(agent: &AuthenticatedAgent) -> GrantResult<&str> {
        agent.owning_client_id().ok_or_else(|| {
            debug!(client_id = %agent.client_id, "Client-only resource refused a user token");
            GrantError::AccessDenied
        })
    }

    /// Require a token owned by a user that still exists
    ///
    /// # Errors
    ///
    /// `AccessDenied` when a client owns the session or the user cannot be
    /// resolved, `Storage` if the lookup fails
    pub async fn require_user_owner(&self, agent: &AuthenticatedAgent) -> GrantResult<Agent> {
        let Some(user_id) = agent.user_id() else {
            debug!(
                client_id = %agent.client_id,
                owner_type = agent.owner.owner_type.as_str(),
                "User resource refused a token without a user owner"
            );
            return Err(GrantError::AccessDenied);
        };
        self.users.get_agent(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, "Access token owner no longer exists");
            GrantError::AccessDenied
        })
    }

    /// Expire one access token (logout)
    ///
    /// Returns false when the token does not exist.
    ///
    /// # Errors
    ///
    /// `Storage` if the write fails
    pub async fn expire_access_token(&self, token_id: &str) -> GrantResult<bool> {
        let expired = self.tokens.expire_access_token(token_id, Utc::now()).await?;
        if expired {
            info!(access_token = %redact_token(token_id), "Access token expired on request");
        }
        Ok(expired)
    }

    /// Expire every access and refresh token of every session of `owner`
    ///
    /// Returns the number of sessions affected.
    ///
    /// # Errors
    ///
    /// `Storage` if the write fails
    pub async fn revoke_sessions_for_owner(&self, owner: &SessionOwner) -> GrantResult<u64> {
        let session_count = self
            .tokens
            .revoke_sessions_for_owner(owner, Utc::now())
            .await?;
        self.events.emit(GrantEvent::SessionsRevoked {
            owner: owner.clone(),
            session_count,
        });
        Ok(session_count)
    }
}
