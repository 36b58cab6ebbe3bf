// ABOUTME: Re-exports command modules for scopegate-cli
// ABOUTME: Provides access to scope, client, user, and token commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod client;
pub mod scope;
pub mod token;
pub mod user;

use std::sync::Arc;

use anyhow::{Error, Result};
use scopegate::config::GrantServerConfig;
use scopegate::database_plugins::{GrantStores, SqliteStore};
use scopegate::models::GrantType;
use scopegate::oauth2_server::OAuth2GrantServer;

/// Grant server over the CLI's store
pub fn grant_server(
    store: &Arc<SqliteStore>,
    config: GrantServerConfig,
) -> Result<OAuth2GrantServer> {
    OAuth2GrantServer::with_tracing_events(config, GrantStores::from_backend(store))
}

/// Parse `--grant` values
pub fn parse_grants(values: &[String]) -> Result<Vec<GrantType>> {
    values
        .iter()
        .map(|value| value.parse::<GrantType>().map_err(Error::from))
        .collect()
}
