// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides seeded stores, a call-counting store wrapper, and a recording event sink
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `scopegate`
//!
//! Every fixture registers the same catalog: scopes `user` and `admin`,
//! client `client1` / `client1secret`, and user `aNewTestUser` /
//! `aUserPassword` holding both scopes.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scopegate::config::GrantServerConfig;
use scopegate::crypto::{hash_client_secret, hash_password_with_cost};
use scopegate::database_plugins::{
    ClientStore, GrantStores, InMemoryStore, RefreshRotation, RefreshTokenStore, ScopeStore,
    SessionStore, SqliteStore, StoreRestrictions, StoreResult, TokenStore, UserStore,
};
use scopegate::models::{
    AccessToken, Agent, Client, GrantType, RefreshToken, Scope, Session, SessionOwner,
};
use scopegate::oauth2_server::{EventSink, GrantEvent, OAuth2GrantServer, TokenRequest};
use scopegate::scopes::ScopeSet;
use tracing::Level;
use uuid::Uuid;

pub const CLIENT_ID: &str = "client1";
pub const CLIENT_SECRET: &str = "client1secret";
pub const USERNAME: &str = "aNewTestUser";
pub const EMAIL: &str = "new.test.user@example.com";
pub const PASSWORD: &str = "aUserPassword";

/// Lowest cost bcrypt accepts; keeps hashing fast in tests
pub const TEST_BCRYPT_COST: u32 = 4;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

pub fn test_client() -> Client {
    test_client_with(
        CLIENT_ID,
        ["user", "admin"],
        vec![GrantType::Password, GrantType::RefreshToken],
    )
}

pub fn test_client_with<const N: usize>(
    client_id: &str,
    scopes: [&str; N],
    grants: Vec<GrantType>,
) -> Client {
    Client::new(
        client_id,
        hash_client_secret(CLIENT_SECRET).unwrap(),
        "Test Client",
        ScopeSet::from_ids(scopes),
        grants,
    )
}

pub fn test_scopes() -> Vec<Scope> {
    let mut user = Scope::new("user", "Regular user access");
    user.grant_types = vec![GrantType::Password, GrantType::RefreshToken];
    let mut admin = Scope::new("admin", "Administrative access");
    admin.grant_types = vec![GrantType::Password];
    vec![user, admin]
}

pub fn test_agent() -> Agent {
    test_agent_with(Some(USERNAME), Some(EMAIL), ["user", "admin"])
}

pub fn test_agent_with<const N: usize>(
    username: Option<&str>,
    email: Option<&str>,
    scopes: [&str; N],
) -> Agent {
    Agent::new(
        username.map(str::to_owned),
        email.map(str::to_owned),
        hash_password_with_cost(PASSWORD, TEST_BCRYPT_COST).unwrap(),
        ScopeSet::from_ids(scopes),
    )
}

/// In-memory store with the standard catalog; returns the seeded agent's id
pub fn create_memory_store(restrictions: StoreRestrictions) -> (Arc<InMemoryStore>, Uuid) {
    init_test_logging();
    let store = InMemoryStore::new(restrictions);
    for scope in test_scopes() {
        store.insert_scope(scope).unwrap();
    }
    store.insert_client(test_client()).unwrap();
    let agent = test_agent();
    let agent_id = agent.id;
    store.insert_agent(agent).unwrap();
    (Arc::new(store), agent_id)
}

/// `SQLite` store with the standard catalog; returns the seeded agent's id
pub async fn create_sqlite_store(
    database_url: &str,
    restrictions: StoreRestrictions,
) -> Result<(Arc<SqliteStore>, Uuid)> {
    init_test_logging();
    let store = SqliteStore::new(database_url, restrictions).await?;
    for scope in test_scopes() {
        store.insert_scope(&scope).await?;
    }
    store.insert_client(&test_client()).await?;
    let agent = test_agent();
    store.insert_agent(&agent).await?;
    Ok((Arc::new(store), agent.id))
}

/// Grant server over an in-memory store configured from `config`
pub fn create_memory_server(
    config: GrantServerConfig,
) -> (OAuth2GrantServer, Arc<InMemoryStore>, Arc<RecordingEventSink>) {
    let (store, _) = create_memory_store(config.restrictions());
    let events = Arc::new(RecordingEventSink::default());
    let server = OAuth2GrantServer::new(config, GrantStores::from_backend(&store), events.clone())
        .expect("valid grant server config");
    (server, store, events)
}

pub fn password_request(scope: Option<&str>) -> TokenRequest {
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, USERNAME, PASSWORD);
    match scope {
        Some(scope) => request.with_scope(scope),
        None => request,
    }
}

pub fn refresh_request(refresh_token: &str, scope: Option<&str>) -> TokenRequest {
    let request = TokenRequest::refresh(CLIENT_ID, CLIENT_SECRET, refresh_token);
    match scope {
        Some(scope) => request.with_scope(scope),
        None => request,
    }
}

/// Event sink keeping every event for assertions
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<GrantEvent>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<GrantEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: GrantEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Store wrapper counting every trait call before delegating
#[derive(Debug)]
pub struct CountingStore {
    inner: Arc<InMemoryStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientStore for CountingStore {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: &str,
        grant_type: GrantType,
    ) -> StoreResult<Option<Client>> {
        self.hit();
        self.inner.get_client(client_id, client_secret, grant_type).await
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<Agent>> {
        self.hit();
        self.inner.find_by_username_or_email(username, email).await
    }

    async fn check_password(&self, agent: &Agent, password: &str) -> bool {
        self.hit();
        self.inner.check_password(agent, password).await
    }

    async fn scopes_for(&self, agent: &Agent) -> StoreResult<ScopeSet> {
        self.hit();
        self.inner.scopes_for(agent).await
    }

    async fn get_agent(&self, agent_id: Uuid) -> StoreResult<Option<Agent>> {
        self.hit();
        self.inner.get_agent(agent_id).await
    }

    async fn reset_password(
        &self,
        agent_id: Uuid,
        token_digest: &str,
        password_hash: &str,
    ) -> StoreResult<bool> {
        self.hit();
        self.inner
            .reset_password(agent_id, token_digest, password_hash)
            .await
    }

    async fn set_password_reset_token(
        &self,
        agent_id: Uuid,
        token_digest: Option<&str>,
    ) -> StoreResult<()> {
        self.hit();
        self.inner.set_password_reset_token(agent_id, token_digest).await
    }
}

#[async_trait]
impl ScopeStore for CountingStore {
    async fn get_scope(
        &self,
        scope_id: &str,
        grant_type: GrantType,
        client_id: Option<&str>,
    ) -> StoreResult<Option<Scope>> {
        self.hit();
        self.inner.get_scope(scope_id, grant_type, client_id).await
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>> {
        self.hit();
        self.inner.get_session(session_id).await
    }

    async fn sessions_for_owner(&self, owner: &SessionOwner) -> StoreResult<Vec<Session>> {
        self.hit();
        self.inner.sessions_for_owner(owner).await
    }
}

#[async_trait]
impl TokenStore for CountingStore {
    async fn get_access_token(&self, token_id: &str) -> StoreResult<Option<AccessToken>> {
        self.hit();
        self.inner.get_access_token(token_id).await
    }

    async fn expire_access_token(&self, token_id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        self.hit();
        self.inner.expire_access_token(token_id, at).await
    }

    async fn store_new_session(
        &self,
        session: &Session,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> StoreResult<()> {
        self.hit();
        self.inner
            .store_new_session(session, access_token, refresh_token)
            .await
    }

    async fn store_rotation(
        &self,
        rotation: &RefreshRotation,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.hit();
        self.inner.store_rotation(rotation, now).await
    }

    async fn revoke_sessions_for_owner(
        &self,
        owner: &SessionOwner,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.hit();
        self.inner.revoke_sessions_for_owner(owner, at).await
    }
}

#[async_trait]
impl RefreshTokenStore for CountingStore {
    async fn get_refresh_token(&self, token_id: &str) -> StoreResult<Option<RefreshToken>> {
        self.hit();
        self.inner.get_refresh_token(token_id).await
    }
}
