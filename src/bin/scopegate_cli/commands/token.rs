// ABOUTME: Grant and token commands for scopegate-cli
// ABOUTME: Runs password and refresh grants, inspects and expires tokens, revokes user sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::Result;
use scopegate::config::GrantServerConfig;
use scopegate::constants::oauth::GRANT_TYPE_PASSWORD;
use scopegate::database_plugins::SqliteStore;
use scopegate::models::SessionOwner;
use scopegate::oauth2_server::TokenRequest;
use tracing::info;
use uuid::Uuid;

use super::grant_server;
use crate::helpers::display::{display_agent, display_grant_result};

/// Arguments of `token password`
pub struct PasswordGrantArgs {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub scope: Option<String>,
}

/// Run a password grant and print the response or error payload
pub async fn password(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    args: PasswordGrantArgs,
) -> Result<()> {
    let request = TokenRequest {
        grant_type: Some(GRANT_TYPE_PASSWORD.to_owned()),
        client_id: Some(args.client_id),
        client_secret: Some(args.client_secret),
        username: args.username,
        email: args.email,
        password: Some(args.password),
        scope: args.scope,
        refresh_token: None,
    };

    let server = grant_server(store, config)?;
    display_grant_result(&server.complete_grant(&request).await)
}

/// Run a refresh token grant and print the response or error payload
pub async fn refresh(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    scope: Option<String>,
) -> Result<()> {
    let mut request = TokenRequest::refresh(client_id, client_secret, refresh_token);
    request.scope = scope;

    let server = grant_server(store, config)?;
    display_grant_result(&server.complete_grant(&request).await)
}

/// Show who an access token belongs to
pub async fn inspect(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    access_token: &str,
) -> Result<()> {
    let guard = grant_server(store, config)?.resource_guard();
    let agent = guard.authenticate(Some(access_token)).await?;
    display_agent(&agent);
    Ok(())
}

/// Expire one access token
pub async fn expire(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    access_token: &str,
) -> Result<()> {
    let guard = grant_server(store, config)?.resource_guard();
    if guard.expire_access_token(access_token).await? {
        println!("Access token expired");
    } else {
        println!("Access token not found");
    }
    Ok(())
}

/// Expire every token of every session of a user
pub async fn revoke_user(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    user_id: Uuid,
) -> Result<()> {
    let guard = grant_server(store, config)?.resource_guard();
    let revoked = guard
        .revoke_sessions_for_owner(&SessionOwner::user(user_id))
        .await?;
    info!("Revoked {} session(s) of user {}", revoked, user_id);
    println!("Revoked {revoked} session(s)");
    Ok(())
}
