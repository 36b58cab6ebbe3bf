// ABOUTME: Scope catalog commands for scopegate-cli
// ABOUTME: Registers scopes together with the grants allowed to issue them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use scopegate::database_plugins::SqliteStore;
use scopegate::models::Scope;
use tracing::info;

use super::parse_grants;

/// Register a scope
pub async fn create(
    store: &SqliteStore,
    id: String,
    description: String,
    grants: &[String],
) -> Result<()> {
    let mut scope = Scope::new(id, description);
    scope.grant_types = parse_grants(grants)?;

    store.insert_scope(&scope).await?;
    info!("Scope '{}' registered", scope.id);
    println!("Scope created: {}", scope.id);
    Ok(())
}
