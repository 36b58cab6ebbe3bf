// ABOUTME: In-memory storage backend implementing every grant capability trait
// ABOUTME: Registries live in DashMaps; sessions and tokens share one RwLock so grant writes are atomic
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use scopegate_core::errors::DatabaseError;
use scopegate_core::models::{
    AccessToken, Agent, Client, GrantType, RefreshToken, Scope, Session, SessionOwner,
};
use scopegate_core::scopes::ScopeSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ClientStore, RefreshRotation, RefreshTokenStore, ScopeStore, SessionStore, StoreRestrictions,
    StoreResult, TokenStore, UserStore,
};
use crate::crypto::{verify_client_secret, verify_password_blocking};

#[derive(Debug, Default)]
struct TokenState {
    sessions: HashMap<Uuid, Session>,
    access_tokens: HashMap<String, AccessToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl TokenState {
    fn ensure_absent(
        &self,
        session_id: Option<Uuid>,
        access_token_id: &str,
        refresh_token_id: Option<&str>,
    ) -> StoreResult<()> {
        if let Some(session_id) = session_id {
            if self.sessions.contains_key(&session_id) {
                return Err(DatabaseError::Duplicate {
                    entity_type: "session",
                    entity_id: session_id.to_string(),
                });
            }
        }
        if self.access_tokens.contains_key(access_token_id) {
            return Err(DatabaseError::Duplicate {
                entity_type: "access token",
                entity_id: access_token_id.to_owned(),
            });
        }
        if let Some(refresh_token_id) = refresh_token_id {
            if self.refresh_tokens.contains_key(refresh_token_id) {
                return Err(DatabaseError::Duplicate {
                    entity_type: "refresh token",
                    entity_id: refresh_token_id.to_owned(),
                });
            }
        }
        Ok(())
    }

    fn refresh_token_is_active(&self, token_id: &str, now: DateTime<Utc>) -> bool {
        self.refresh_tokens
            .get(token_id)
            .is_some_and(|token| token.is_active_at(now))
    }

    fn revoke_access_token(&mut self, token_id: &str, at: DateTime<Utc>) -> bool {
        self.access_tokens.get_mut(token_id).is_some_and(|token| {
            token.revoked_at.get_or_insert(at);
            true
        })
    }
}

/// Storage backend holding everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    restrictions: StoreRestrictions,
    clients: DashMap<String, Client>,
    scopes: DashMap<String, Scope>,
    agents: DashMap<Uuid, Agent>,
    state: RwLock<TokenState>,
}

impl InMemoryStore {
    /// Create an empty store enforcing `restrictions`
    #[must_use]
    pub fn new(restrictions: StoreRestrictions) -> Self {
        Self {
            restrictions,
            ..Self::default()
        }
    }

    /// Register a client
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the client id is taken
    pub fn insert_client(&self, client: Client) -> StoreResult<()> {
        if self.clients.contains_key(&client.client_id) {
            return Err(DatabaseError::Duplicate {
                entity_type: "client",
                entity_id: client.client_id,
            });
        }
        self.clients.insert(client.client_id.clone(), client); // Safe: key needs its own copy
        Ok(())
    }

    /// Register a scope
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the scope id is taken
    pub fn insert_scope(&self, scope: Scope) -> StoreResult<()> {
        if self.scopes.contains_key(&scope.id) {
            return Err(DatabaseError::Duplicate {
                entity_type: "scope",
                entity_id: scope.id,
            });
        }
        self.scopes.insert(scope.id.clone(), scope); // Safe: key needs its own copy
        Ok(())
    }

    /// Register an agent
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the id, username, or email is taken
    pub fn insert_agent(&self, agent: Agent) -> StoreResult<()> {
        let clash = self.agents.iter().find(|existing| {
            existing.id == agent.id
                || (agent.username.is_some() && existing.username == agent.username)
                || (agent.email.is_some() && existing.email == agent.email)
        });
        if let Some(existing) = clash {
            return Err(DatabaseError::Duplicate {
                entity_type: "agent",
                entity_id: existing.id.to_string(),
            });
        }
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Number of stored access tokens
    pub async fn access_token_count(&self) -> usize {
        self.state.read().await.access_tokens.len()
    }

    /// Number of stored refresh tokens
    pub async fn refresh_token_count(&self) -> usize {
        self.state.read().await.refresh_tokens.len()
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: &str,
        grant_type: GrantType,
    ) -> StoreResult<Option<Client>> {
        let Some(client) = self.clients.get(client_id).map(|entry| entry.clone()) else {
            return Ok(None);
        };
        if !verify_client_secret(client_secret, &client.secret_hash) {
            return Ok(None);
        }
        if self.restrictions.limit_clients_to_grants && !client.allows_grant(grant_type) {
            return Ok(None);
        }
        Ok(Some(client))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<Agent>> {
        Ok(self
            .agents
            .iter()
            .find(|agent| agent.matches_identifiers(username, email))
            .map(|entry| entry.value().clone()))
    }

    async fn check_password(&self, agent: &Agent, password: &str) -> bool {
        verify_password_blocking(password.to_owned(), agent.password_hash.clone()).await
    }

    async fn scopes_for(&self, agent: &Agent) -> StoreResult<ScopeSet> {
        Ok(self
            .agents
            .get(&agent.id)
            .map_or_else(|| agent.scopes.clone(), |stored| stored.scopes.clone()))
    }

    async fn get_agent(&self, agent_id: Uuid) -> StoreResult<Option<Agent>> {
        Ok(self.agents.get(&agent_id).map(|entry| entry.clone()))
    }

    async fn reset_password(
        &self,
        agent_id: Uuid,
        token_digest: &str,
        password_hash: &str,
    ) -> StoreResult<bool> {
        // The shard lock held by get_mut makes the digest check and the write one step
        let Some(mut agent) = self.agents.get_mut(&agent_id) else {
            return Ok(false);
        };
        if agent.password_reset_token_hash.as_deref() != Some(token_digest) {
            return Ok(false);
        }
        password_hash.clone_into(&mut agent.password_hash);
        agent.password_reset_token_hash = None;
        Ok(true)
    }

    async fn set_password_reset_token(
        &self,
        agent_id: Uuid,
        token_digest: Option<&str>,
    ) -> StoreResult<()> {
        let mut agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or_else(|| DatabaseError::NotFound {
                entity_type: "agent",
                entity_id: agent_id.to_string(),
            })?;
        agent.password_reset_token_hash = token_digest.map(str::to_owned);
        Ok(())
    }
}

#[async_trait]
impl ScopeStore for InMemoryStore {
    async fn get_scope(
        &self,
        scope_id: &str,
        grant_type: GrantType,
        client_id: Option<&str>,
    ) -> StoreResult<Option<Scope>> {
        let Some(scope) = self.scopes.get(scope_id).map(|entry| entry.clone()) else {
            return Ok(None);
        };
        if self.restrictions.limit_scopes_to_grants && !scope.allows_grant(grant_type) {
            return Ok(None);
        }
        if self.restrictions.limit_clients_to_scopes {
            let client_allows = client_id
                .and_then(|id| self.clients.get(id))
                .is_some_and(|client| client.scopes.contains(scope_id));
            if !client_allows {
                return Ok(None);
            }
        }
        Ok(Some(scope))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.state.read().await.sessions.get(&session_id).cloned())
    }

    async fn sessions_for_owner(&self, owner: &SessionOwner) -> StoreResult<Vec<Session>> {
        let state = self.state.read().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|session| &session.owner == owner)
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn get_access_token(&self, token_id: &str) -> StoreResult<Option<AccessToken>> {
        Ok(self.state.read().await.access_tokens.get(token_id).cloned())
    }

    async fn expire_access_token(&self, token_id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self.state.write().await.revoke_access_token(token_id, at))
    }

    async fn store_new_session(
        &self,
        session: &Session,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.ensure_absent(
            Some(session.id),
            &access_token.id,
            refresh_token.map(|token| token.id.as_str()),
        )?;

        state.sessions.insert(session.id, session.clone());
        state
            .access_tokens
            .insert(access_token.id.clone(), access_token.clone());
        if let Some(refresh_token) = refresh_token {
            state
                .refresh_tokens
                .insert(refresh_token.id.clone(), refresh_token.clone());
        }
        Ok(())
    }

    async fn store_rotation(
        &self,
        rotation: &RefreshRotation,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.refresh_token_is_active(&rotation.old_refresh_token_id, now) {
            return Ok(false);
        }
        state.ensure_absent(
            None,
            &rotation.new_access_token.id,
            rotation.new_refresh_token.as_ref().map(|token| token.id.as_str()),
        )?;

        if let Some(new_refresh_token) = &rotation.new_refresh_token {
            if let Some(old) = state.refresh_tokens.get_mut(&rotation.old_refresh_token_id) {
                old.revoked_at = Some(now);
            }
            state
                .refresh_tokens
                .insert(new_refresh_token.id.clone(), new_refresh_token.clone());
        }
        state.revoke_access_token(&rotation.old_access_token_id, now);
        state.access_tokens.insert(
            rotation.new_access_token.id.clone(),
            rotation.new_access_token.clone(),
        );
        Ok(true)
    }

    async fn revoke_sessions_for_owner(
        &self,
        owner: &SessionOwner,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let session_ids: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|session| &session.owner == owner)
            .map(|session| session.id)
            .collect();

        let mut revoked_access_ids = HashSet::new();
        for token in state.access_tokens.values_mut() {
            if session_ids.contains(&token.session_id) {
                token.revoked_at.get_or_insert(at);
                revoked_access_ids.insert(token.id.clone());
            }
        }
        for token in state.refresh_tokens.values_mut() {
            if revoked_access_ids.contains(&token.access_token_id) {
                token.revoked_at.get_or_insert(at);
            }
        }
        Ok(session_ids.len() as u64)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn get_refresh_token(&self, token_id: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self.state.read().await.refresh_tokens.get(token_id).cloned())
    }
}
