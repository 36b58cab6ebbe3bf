// ABOUTME: Client registration commands for scopegate-cli
// ABOUTME: Secrets are hashed with Argon2 before they reach the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use scopegate::crypto::hash_client_secret;
use scopegate::database_plugins::SqliteStore;
use scopegate::models::Client;
use scopegate::scopes::ScopeSet;
use tracing::info;

use super::parse_grants;

/// Register a client
pub async fn create(
    store: &SqliteStore,
    id: String,
    secret: &str,
    name: String,
    scopes: Vec<String>,
    grants: &[String],
) -> Result<()> {
    let client = Client::new(
        id,
        hash_client_secret(secret)?,
        name,
        ScopeSet::from_ids(scopes),
        parse_grants(grants)?,
    );

    store.insert_client(&client).await?;
    info!("Client '{}' registered", client.client_id);
    println!("Client created: {} ({})", client.client_id, client.name);
    Ok(())
}
