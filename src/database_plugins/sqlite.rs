// ABOUTME: SQLite storage backend for clients, agents, scopes, sessions, and tokens
// ABOUTME: Multi-row grant writes run inside a TransactionGuard; refresh consumption is a conditional UPDATE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `SQLite` backend
//!
//! Scope sets are stored in link tables with a `position` column so that the
//! order in which scopes were granted survives a round trip. All timestamps
//! are Unix milliseconds (see [`super::shared::mappers`]).

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scopegate_core::errors::DatabaseError;
use scopegate_core::models::{
    AccessToken, Agent, Client, GrantType, RefreshToken, Scope, Session, SessionOwner,
};
use scopegate_core::scopes::ScopeSet;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::shared::mappers::{
    access_token_from_row, agent_from_row, column, from_millis, parse_grant_types,
    refresh_token_from_row, session_from_row, to_millis,
};
use super::shared::transactions::SqliteTransactionGuard;
use super::{
    ClientStore, RefreshRotation, RefreshTokenStore, ScopeStore, SessionStore, StoreRestrictions,
    StoreResult, TokenStore, UserStore,
};
use crate::crypto::{verify_client_secret, verify_password_blocking};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Link tables holding ordered scope ids
#[derive(Debug, Clone, Copy)]
enum ScopeLink {
    Client,
    Agent,
    Session,
    AccessToken,
}

impl ScopeLink {
    const fn table(self) -> &'static str {
        match self {
            Self::Client => "oauth_client_scopes",
            Self::Agent => "agent_scopes",
            Self::Session => "oauth_session_scopes",
            Self::AccessToken => "oauth_access_token_scopes",
        }
    }

    const fn key_column(self) -> &'static str {
        match self {
            Self::Client => "client_id",
            Self::Agent => "agent_id",
            Self::Session => "session_id",
            Self::AccessToken => "access_token_id",
        }
    }
}

/// `SQLite`-backed grant store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    restrictions: StoreRestrictions,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url` and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or a migration fails
    pub async fn new(database_url: &str, restrictions: StoreRestrictions) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionError(format!("{database_url}: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // Every connection to sqlite::memory: is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let store = Self { pool, restrictions };
        store.migrate().await?;
        debug!("SQLite grant store ready at {}", database_url);
        Ok(store)
    }

    /// Pool used by this store
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the grant tables if they do not exist
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::MigrationError` if any statement fails
    pub async fn migrate(&self) -> StoreResult<()> {
        self.migrate_catalog().await?;
        self.migrate_agents().await?;
        self.migrate_sessions().await?;
        self.migrate_tokens().await?;
        info!("Grant store migrations complete");
        Ok(())
    }

    async fn run_migration(&self, statement: &str) -> StoreResult<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        Ok(())
    }

    async fn migrate_catalog(&self) -> StoreResult<()> {
        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_clients (
                client_id TEXT PRIMARY KEY,
                secret_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_client_grants (
                client_id TEXT NOT NULL REFERENCES oauth_clients(client_id) ON DELETE CASCADE,
                grant_type TEXT NOT NULL,
                PRIMARY KEY (client_id, grant_type)
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_client_scopes (
                client_id TEXT NOT NULL REFERENCES oauth_clients(client_id) ON DELETE CASCADE,
                scope_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (client_id, scope_id)
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_scopes (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_scope_grants (
                scope_id TEXT NOT NULL REFERENCES oauth_scopes(id) ON DELETE CASCADE,
                grant_type TEXT NOT NULL,
                PRIMARY KEY (scope_id, grant_type)
            )
            ",
        )
        .await
    }

    async fn migrate_agents(&self) -> StoreResult<()> {
        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE,
                email TEXT UNIQUE,
                password_hash TEXT NOT NULL,
                password_reset_token_hash TEXT,
                created_at INTEGER NOT NULL,
                CHECK (username IS NOT NULL OR email IS NOT NULL)
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS agent_scopes (
                agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
                scope_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (agent_id, scope_id)
            )
            ",
        )
        .await
    }

    async fn migrate_sessions(&self) -> StoreResult<()> {
        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_sessions (
                id TEXT PRIMARY KEY,
                owner_type TEXT NOT NULL CHECK (owner_type IN ('user', 'client')),
                owner_id TEXT NOT NULL,
                client_id TEXT NOT NULL REFERENCES oauth_clients(client_id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_session_scopes (
                session_id TEXT NOT NULL REFERENCES oauth_sessions(id) ON DELETE CASCADE,
                scope_id TEXT NOT NULL REFERENCES oauth_scopes(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (session_id, scope_id)
            )
            ",
        )
        .await?;

        self.run_migration(
            "CREATE INDEX IF NOT EXISTS idx_oauth_sessions_owner ON oauth_sessions(owner_type, owner_id)",
        )
        .await
    }

    async fn migrate_tokens(&self) -> StoreResult<()> {
        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_access_tokens (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES oauth_sessions(id) ON DELETE CASCADE,
                expire_time INTEGER NOT NULL,
                revoked_at INTEGER,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_access_token_scopes (
                access_token_id TEXT NOT NULL REFERENCES oauth_access_tokens(id) ON DELETE CASCADE,
                scope_id TEXT NOT NULL REFERENCES oauth_scopes(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (access_token_id, scope_id)
            )
            ",
        )
        .await?;

        self.run_migration(
            r"
            CREATE TABLE IF NOT EXISTS oauth_refresh_tokens (
                id TEXT PRIMARY KEY,
                access_token_id TEXT NOT NULL REFERENCES oauth_access_tokens(id) ON DELETE CASCADE,
                expire_time INTEGER NOT NULL,
                revoked_at INTEGER,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .await?;

        self.run_migration(
            "CREATE INDEX IF NOT EXISTS idx_oauth_access_tokens_session ON oauth_access_tokens(session_id)",
        )
        .await?;

        self.run_migration(
            "CREATE INDEX IF NOT EXISTS idx_oauth_refresh_tokens_access ON oauth_refresh_tokens(access_token_id)",
        )
        .await
    }

    /// Register a client with its scopes and grants
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the client id is taken
    pub async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);

        sqlx::query(
            "INSERT INTO oauth_clients (client_id, secret_hash, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&client.client_id)
        .bind(&client.secret_hash)
        .bind(&client.name)
        .bind(to_millis(client.created_at))
        .execute(guard.executor()?)
        .await?;

        for grant_type in &client.grant_types {
            sqlx::query("INSERT INTO oauth_client_grants (client_id, grant_type) VALUES (?1, ?2)")
                .bind(&client.client_id)
                .bind(grant_type.as_str())
                .execute(guard.executor()?)
                .await?;
        }
        insert_scope_links(
            guard.executor()?,
            ScopeLink::Client,
            &client.client_id,
            &client.scopes,
        )
        .await?;

        guard.commit().await
    }

    /// Register a scope with its grant restrictions
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the scope id is taken
    pub async fn insert_scope(&self, scope: &Scope) -> StoreResult<()> {
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);

        sqlx::query("INSERT INTO oauth_scopes (id, description) VALUES (?1, ?2)")
            .bind(&scope.id)
            .bind(&scope.description)
            .execute(guard.executor()?)
            .await?;

        for grant_type in &scope.grant_types {
            sqlx::query("INSERT INTO oauth_scope_grants (scope_id, grant_type) VALUES (?1, ?2)")
                .bind(&scope.id)
                .bind(grant_type.as_str())
                .execute(guard.executor()?)
                .await?;
        }

        guard.commit().await
    }

    /// Register an agent with its scopes
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Duplicate` if the id, username, or email is taken
    pub async fn insert_agent(&self, agent: &Agent) -> StoreResult<()> {
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);
        let agent_id = agent.id.to_string();

        sqlx::query(
            r"
            INSERT INTO agents (id, username, email, password_hash, password_reset_token_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&agent_id)
        .bind(&agent.username)
        .bind(&agent.email)
        .bind(&agent.password_hash)
        .bind(&agent.password_reset_token_hash)
        .bind(to_millis(agent.created_at))
        .execute(guard.executor()?)
        .await?;

        insert_scope_links(guard.executor()?, ScopeLink::Agent, &agent_id, &agent.scopes).await?;

        guard.commit().await
    }

    async fn scope_links(&self, link: ScopeLink, key: &str) -> StoreResult<ScopeSet> {
        let sql = format!(
            "SELECT scope_id FROM {} WHERE {} = ?1 ORDER BY position",
            link.table(),
            link.key_column()
        );
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await?;
        Ok(ScopeSet::from_ids(ids))
    }

    async fn grant_links(&self, sql: &str, key: &str) -> StoreResult<Vec<GrantType>> {
        let values: Vec<String> = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await?;
        Ok(parse_grant_types(values))
    }

    async fn load_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        let Some(row) = sqlx::query(
            "SELECT client_id, secret_hash, name, created_at FROM oauth_clients WHERE client_id = ?1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        Ok(Some(Client {
            client_id: column(&row, "client_id")?,
            secret_hash: column(&row, "secret_hash")?,
            name: column(&row, "name")?,
            scopes: self.scope_links(ScopeLink::Client, client_id).await?,
            grant_types: self
                .grant_links(
                    "SELECT grant_type FROM oauth_client_grants WHERE client_id = ?1",
                    client_id,
                )
                .await?,
            created_at: from_millis(column(&row, "created_at")?)?,
        }))
    }

    async fn load_agent(&self, row: &SqliteRow) -> StoreResult<Agent> {
        let agent_id: String = column(row, "id")?;
        let scopes = self.scope_links(ScopeLink::Agent, &agent_id).await?;
        agent_from_row(row, scopes)
    }
}

async fn insert_scope_links(
    conn: &mut SqliteConnection,
    link: ScopeLink,
    key: &str,
    scopes: &ScopeSet,
) -> StoreResult<()> {
    let sql = format!(
        "INSERT INTO {} ({}, scope_id, position) VALUES (?1, ?2, ?3)",
        link.table(),
        link.key_column()
    );
    for (position, scope_id) in scopes.iter().enumerate() {
        sqlx::query(&sql)
            .bind(key)
            .bind(scope_id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_access_token(conn: &mut SqliteConnection, token: &AccessToken) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO oauth_access_tokens (id, session_id, expire_time, revoked_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&token.id)
    .bind(token.session_id.to_string())
    .bind(to_millis(token.expire_time))
    .bind(token.revoked_at.map(to_millis))
    .bind(to_millis(token.created_at))
    .execute(&mut *conn)
    .await?;

    insert_scope_links(conn, ScopeLink::AccessToken, &token.id, &token.scopes).await
}

async fn insert_refresh_token(
    conn: &mut SqliteConnection,
    token: &RefreshToken,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO oauth_refresh_tokens (id, access_token_id, expire_time, revoked_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&token.id)
    .bind(&token.access_token_id)
    .bind(to_millis(token.expire_time))
    .bind(token.revoked_at.map(to_millis))
    .bind(to_millis(token.created_at))
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl ClientStore for SqliteStore {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: &str,
        grant_type: GrantType,
    ) -> StoreResult<Option<Client>> {
        let Some(client) = self.load_client(client_id).await? else {
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
impl UserStore for SqliteStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<Agent>> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, password_reset_token_hash, created_at
            FROM agents
            WHERE (?1 IS NULL OR username = ?1) AND (?2 IS NULL OR email = ?2)
            LIMIT 1
            ",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_agent(&row).await?)),
            None => Ok(None),
        }
    }

    async fn check_password(&self, agent: &Agent, password: &str) -> bool {
        verify_password_blocking(password.to_owned(), agent.password_hash.clone()).await
    }

    async fn scopes_for(&self, agent: &Agent) -> StoreResult<ScopeSet> {
        self.scope_links(ScopeLink::Agent, &agent.id.to_string())
            .await
    }

    async fn get_agent(&self, agent_id: Uuid) -> StoreResult<Option<Agent>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, password_reset_token_hash, created_at
            FROM agents WHERE id = ?1
            ",
        )
        .bind(agent_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_agent(&row).await?)),
            None => Ok(None),
        }
    }

    async fn reset_password(
        &self,
        agent_id: Uuid,
        token_digest: &str,
        password_hash: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE agents SET password_hash = ?1, password_reset_token_hash = NULL
            WHERE id = ?2 AND password_reset_token_hash = ?3
            ",
        )
        .bind(password_hash)
        .bind(agent_id.to_string())
        .bind(token_digest)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_reset_token(
        &self,
        agent_id: Uuid,
        token_digest: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE agents SET password_reset_token_hash = ?1 WHERE id = ?2")
            .bind(token_digest)
            .bind(agent_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                entity_type: "agent",
                entity_id: agent_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ScopeStore for SqliteStore {
    async fn get_scope(
        &self,
        scope_id: &str,
        grant_type: GrantType,
        client_id: Option<&str>,
    ) -> StoreResult<Option<Scope>> {
        let Some(row) = sqlx::query("SELECT id, description FROM oauth_scopes WHERE id = ?1")
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let scope = Scope {
            id: column(&row, "id")?,
            description: column(&row, "description")?,
            grant_types: self
                .grant_links(
                    "SELECT grant_type FROM oauth_scope_grants WHERE scope_id = ?1",
                    scope_id,
                )
                .await?,
        };

        if self.restrictions.limit_scopes_to_grants && !scope.allows_grant(grant_type) {
            return Ok(None);
        }
        if self.restrictions.limit_clients_to_scopes {
            let Some(client_id) = client_id else {
                return Ok(None);
            };
            let client_scopes = self.scope_links(ScopeLink::Client, client_id).await?;
            if !client_scopes.contains(scope_id) {
                return Ok(None);
            }
        }
        Ok(Some(scope))
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>> {
        let session_id = session_id.to_string();
        let Some(row) = sqlx::query(
            "SELECT id, owner_type, owner_id, client_id, created_at FROM oauth_sessions WHERE id = ?1",
        )
        .bind(&session_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let scopes = self.scope_links(ScopeLink::Session, &session_id).await?;
        Ok(Some(session_from_row(&row, scopes)?))
    }

    async fn sessions_for_owner(&self, owner: &SessionOwner) -> StoreResult<Vec<Session>> {
        let rows = sqlx::query(
            r"
            SELECT id, owner_type, owner_id, client_id, created_at
            FROM oauth_sessions
            WHERE owner_type = ?1 AND owner_id = ?2
            ORDER BY created_at
            ",
        )
        .bind(owner.owner_type.as_str())
        .bind(&owner.owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_id: String = column(row, "id")?;
            let scopes = self.scope_links(ScopeLink::Session, &session_id).await?;
            sessions.push(session_from_row(row, scopes)?);
        }
        Ok(sessions)
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn get_access_token(&self, token_id: &str) -> StoreResult<Option<AccessToken>> {
        let Some(row) = sqlx::query(
            "SELECT id, session_id, expire_time, revoked_at, created_at FROM oauth_access_tokens WHERE id = ?1",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let scopes = self.scope_links(ScopeLink::AccessToken, token_id).await?;
        Ok(Some(access_token_from_row(&row, scopes)?))
    }

    async fn expire_access_token(&self, token_id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let at = to_millis(at);
        let result = sqlx::query(
            "UPDATE oauth_access_tokens SET revoked_at = COALESCE(revoked_at, ?1) WHERE id = ?2",
        )
        .bind(at)
        .bind(token_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn store_new_session(
        &self,
        session: &Session,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> StoreResult<()> {
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);
        let session_id = session.id.to_string();

        sqlx::query(
            r"
            INSERT INTO oauth_sessions (id, owner_type, owner_id, client_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(&session_id)
        .bind(session.owner.owner_type.as_str())
        .bind(&session.owner.owner_id)
        .bind(&session.client_id)
        .bind(to_millis(session.created_at))
        .execute(guard.executor()?)
        .await?;

        insert_scope_links(
            guard.executor()?,
            ScopeLink::Session,
            &session_id,
            &session.scopes,
        )
        .await?;
        insert_access_token(guard.executor()?, access_token).await?;
        if let Some(refresh_token) = refresh_token {
            insert_refresh_token(guard.executor()?, refresh_token).await?;
        }

        guard.commit().await
    }

    async fn store_rotation(
        &self,
        rotation: &RefreshRotation,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let now_millis = to_millis(now);
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);

        // The conditional UPDATE runs first so this transaction holds the write
        // lock before anything else is read or written. Without rotation it
        // rewrites nothing and only checks the token is still redeemable.
        let consume_sql = if rotation.new_refresh_token.is_some() {
            "UPDATE oauth_refresh_tokens SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL AND expire_time > ?1"
        } else {
            "UPDATE oauth_refresh_tokens SET revoked_at = NULL WHERE id = ?2 AND revoked_at IS NULL AND expire_time > ?1"
        };
        let consumed = sqlx::query(consume_sql)
            .bind(now_millis)
            .bind(&rotation.old_refresh_token_id)
            .execute(guard.executor()?)
            .await?;

        if consumed.rows_affected() == 0 {
            guard.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE oauth_access_tokens SET revoked_at = COALESCE(revoked_at, ?1) WHERE id = ?2",
        )
        .bind(now_millis)
        .bind(&rotation.old_access_token_id)
        .execute(guard.executor()?)
        .await?;

        insert_access_token(guard.executor()?, &rotation.new_access_token).await?;
        if let Some(new_refresh_token) = &rotation.new_refresh_token {
            insert_refresh_token(guard.executor()?, new_refresh_token).await?;
        }

        guard.commit().await?;
        Ok(true)
    }

    async fn revoke_sessions_for_owner(
        &self,
        owner: &SessionOwner,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let at = to_millis(at);
        let mut guard = SqliteTransactionGuard::new(self.pool.begin().await?);

        sqlx::query(
            r"
            UPDATE oauth_refresh_tokens SET revoked_at = ?1
            WHERE revoked_at IS NULL AND access_token_id IN (
                SELECT t.id FROM oauth_access_tokens t
                JOIN oauth_sessions s ON t.session_id = s.id
                WHERE s.owner_type = ?2 AND s.owner_id = ?3
            )
            ",
        )
        .bind(at)
        .bind(owner.owner_type.as_str())
        .bind(&owner.owner_id)
        .execute(guard.executor()?)
        .await?;

        sqlx::query(
            r"
            UPDATE oauth_access_tokens SET revoked_at = ?1
            WHERE revoked_at IS NULL AND session_id IN (
                SELECT id FROM oauth_sessions WHERE owner_type = ?2 AND owner_id = ?3
            )
            ",
        )
        .bind(at)
        .bind(owner.owner_type.as_str())
        .bind(&owner.owner_id)
        .execute(guard.executor()?)
        .await?;

        let row = sqlx::query(
            "SELECT COUNT(*) AS session_count FROM oauth_sessions WHERE owner_type = ?1 AND owner_id = ?2",
        )
        .bind(owner.owner_type.as_str())
        .bind(&owner.owner_id)
        .fetch_one(guard.executor()?)
        .await?;
        let session_count: i64 = row.try_get("session_count")?;

        guard.commit().await?;
        Ok(u64::try_from(session_count).unwrap_or(0))
    }
}

#[async_trait]
impl RefreshTokenStore for SqliteStore {
    async fn get_refresh_token(&self, token_id: &str) -> StoreResult<Option<RefreshToken>> {
        let row = sqlx::query(
            "SELECT id, access_token_id, expire_time, revoked_at, created_at FROM oauth_refresh_tokens WHERE id = ?1",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(refresh_token_from_row).transpose()
    }
}
