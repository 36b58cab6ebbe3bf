// ABOUTME: Main library entry point for the scopegate OAuth 2.0 grant engine
// ABOUTME: Password and refresh token grants with a scope-based authorization model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Scopegate
//!
//! An OAuth 2.0 token endpoint core for the resource owner password grant and
//! the refresh token grant.
//!
//! ## Features
//!
//! - **Client authentication**: client id / secret checked against a client store
//! - **Credential verification**: username or email plus password
//! - **Scope negotiation**: delimiter parsing, owner restriction, default scopes, catalog lookup
//! - **Token lifecycle**: 256-bit opaque tokens, absolute expiry, optional refresh rotation
//! - **Storage**: in-memory and `SQLite` backends behind capability traits
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use scopegate::config::GrantServerConfig;
//! use scopegate::database_plugins::{GrantStores, SqliteStore};
//! use scopegate::oauth2_server::{OAuth2GrantServer, TokenRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GrantServerConfig::from_env()?;
//!     let store = Arc::new(SqliteStore::new("sqlite::memory:", config.restrictions()).await?);
//!     let server = OAuth2GrantServer::with_tracing_events(config, GrantStores::from_backend(&store))?;
//!
//!     let request = TokenRequest::password("client1", "client1secret", "aNewTestUser", "aUserPassword")
//!         .with_scope("user,admin");
//!     match server.complete_grant(&request).await {
//!         Ok(response) => println!("{}", serde_json::to_string(&response)?),
//!         Err(error) => eprintln!("{} ({})", error, error.http_status()),
//!     }
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Token ids and credential hashing
pub mod crypto;

/// Storage capability traits and backends
pub mod database_plugins;

/// Structured logging
pub mod logging;

/// OAuth 2.0 grant engine
pub mod oauth2_server;

pub use scopegate_core::constants;
pub use scopegate_core::errors;
pub use scopegate_core::models;
pub use scopegate_core::scopes;
