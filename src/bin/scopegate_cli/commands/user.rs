// ABOUTME: User management commands for scopegate-cli
// ABOUTME: Creates users and drives the password reset flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::{bail, Result};
use scopegate::config::GrantServerConfig;
use scopegate::crypto::hash_password;
use scopegate::database_plugins::SqliteStore;
use scopegate::models::Agent;
use scopegate::oauth2_server::PasswordResetService;
use scopegate::scopes::ScopeSet;
use tracing::info;
use uuid::Uuid;

use super::grant_server;
use crate::helpers::display::display_user_created;

/// Create a user
pub async fn create(
    store: &SqliteStore,
    username: Option<String>,
    email: Option<String>,
    password: &str,
    scopes: Vec<String>,
) -> Result<()> {
    if username.is_none() && email.is_none() {
        bail!("A user needs --username, --email, or both");
    }

    let agent = Agent::new(username, email, hash_password(password)?, ScopeSet::from_ids(scopes));
    store.insert_agent(&agent).await?;
    info!("User {} created", agent.id);

    display_user_created(&agent);
    Ok(())
}

/// Generate and print a password reset token
pub async fn reset_token(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    user_id: Uuid,
) -> Result<()> {
    let service = reset_service(store, config)?;
    let token = service.generate_reset_token(user_id).await?;
    println!("{token}");
    Ok(())
}

/// Change a password with a reset token
pub async fn change_password(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
    user_id: Uuid,
    token: &str,
    password: &str,
) -> Result<()> {
    let service = reset_service(store, config)?;
    let revoked = service.change_password(user_id, token, password).await?;
    println!("Password changed; {revoked} session(s) revoked");
    Ok(())
}

fn reset_service(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
) -> Result<PasswordResetService> {
    let server = grant_server(store, config)?;
    Ok(PasswordResetService::new(store.clone(), server.resource_guard()))
}
