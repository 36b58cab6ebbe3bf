// ABOUTME: Configuration management module for the grant server and its storage
// ABOUTME: Environment-only configuration: OAUTH_* grant settings and DATABASE_URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for Scopegate
//!
//! - **Environment**: Env var parsing helpers and database settings
//! - **OAuth**: Token lifetimes, scope policy, and client/scope restrictions

/// Environment parsing helpers and database configuration
pub mod environment;
/// Grant server configuration
pub mod oauth;

pub use environment::DatabaseConfig;
pub use oauth::GrantServerConfig;
