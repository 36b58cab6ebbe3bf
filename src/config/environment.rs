// ABOUTME: Environment variable parsing helpers and database settings
// ABOUTME: Shared by the grant server configuration and the management CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Default `SQLite` database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/scopegate.db";

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL (`sqlite:` or `sqlite::memory:`)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_owned(),
        }
    }
}

impl DatabaseConfig {
    /// Load database settings from `DATABASE_URL`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: env_var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
        }
    }
}

/// Read an environment variable, falling back to `default` when unset
#[must_use]
pub fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`)
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean environment variable
///
/// # Errors
///
/// Returns an error if the variable is set to something that is not a boolean
pub fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => {
            parse_bool(&value).ok_or_else(|| anyhow!("{key} must be a boolean, got '{value}'"))
        }
        Err(_) => Ok(default),
    }
}

/// Read an unsigned integer environment variable
///
/// # Errors
///
/// Returns an error if the variable is set to something that is not an unsigned integer
pub fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} must be an unsigned integer, got '{value}': {e}")),
        Err(_) => Ok(default),
    }
}

/// Split a delimited scope list, trimming and dropping empty entries
#[must_use]
pub fn parse_scope_list(raw: &str, delimiter: &str) -> Vec<String> {
    raw.split(delimiter)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" on "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_scope_list() {
        assert_eq!(parse_scope_list("user, admin,", ","), vec!["user", "admin"]);
        assert_eq!(parse_scope_list("read write", " "), vec!["read", "write"]);
        assert!(parse_scope_list(" , ", ",").is_empty());
    }
}
