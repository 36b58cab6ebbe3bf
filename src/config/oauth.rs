// ABOUTME: Grant server configuration: token lifetimes, scope policy, and store restrictions
// ABOUTME: Loaded from OAUTH_* environment variables with validation of nonsensical values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{anyhow, Result};
use chrono::Duration;
use scopegate_core::constants::oauth::{
    DEFAULT_PASSWORD_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_ACCESS_TOKEN_TTL_SECS,
    DEFAULT_REFRESH_TOKEN_TTL_SECS, DEFAULT_SCOPE_DELIMITER,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::environment::{env_bool, env_u64, env_var_or, parse_scope_list};
use crate::database_plugins::StoreRestrictions;
use crate::oauth2_server::scope_validator::ScopePolicy;

/// Longest accepted token lifetime (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 315_360_000;

/// Configuration of the password and refresh token grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantServerConfig {
    /// Access token lifetime for the password grant (seconds)
    pub password_access_token_ttl_secs: u64,
    /// Access token lifetime for tokens minted by the refresh grant (seconds)
    pub refresh_access_token_ttl_secs: u64,
    /// Refresh token lifetime (seconds)
    pub refresh_token_ttl_secs: u64,
    /// Whether the refresh grant is enabled; password grants only mint refresh tokens when it is
    pub refresh_grant_enabled: bool,
    /// Expire the presented refresh token and mint a new one on every refresh
    pub rotate_refresh_tokens: bool,
    /// Delimiter between scope ids in the `scope` parameter
    pub scope_delimiter: String,
    /// Scopes used when the request asks for none
    pub default_scope: Option<Vec<String>>,
    /// Reject requests without scopes when no default is configured
    pub scope_param_required: bool,
    /// Reject requested scopes the user does not hold instead of dropping them
    pub exception_on_invalid_scope: bool,
    /// Only let clients use the grants they are registered for
    pub limit_clients_to_grants: bool,
    /// Only let clients request the scopes they are registered for
    pub limit_clients_to_scopes: bool,
    /// Only issue scopes through the grants they are registered for
    pub limit_scopes_to_grants: bool,
}

impl Default for GrantServerConfig {
    fn default() -> Self {
        Self {
            password_access_token_ttl_secs: DEFAULT_PASSWORD_ACCESS_TOKEN_TTL_SECS,
            refresh_access_token_ttl_secs: DEFAULT_REFRESH_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            refresh_grant_enabled: true,
            rotate_refresh_tokens: true,
            scope_delimiter: DEFAULT_SCOPE_DELIMITER.to_owned(),
            default_scope: None,
            scope_param_required: false,
            exception_on_invalid_scope: false,
            limit_clients_to_grants: false,
            limit_clients_to_scopes: false,
            limit_scopes_to_grants: false,
        }
    }
}

impl GrantServerConfig {
    /// Load grant configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result fails validation
    pub fn from_env() -> Result<Self> {
        let scope_delimiter = env_var_or("OAUTH_SCOPE_DELIMITER", DEFAULT_SCOPE_DELIMITER);
        let default_scope = env_var_or("OAUTH_DEFAULT_SCOPE", "");
        let default_scope = if default_scope.trim().is_empty() {
            None
        } else {
            Some(parse_scope_list(&default_scope, &scope_delimiter))
        };

        let config = Self {
            password_access_token_ttl_secs: env_u64(
                "OAUTH_PASSWORD_ACCESS_TOKEN_TTL",
                DEFAULT_PASSWORD_ACCESS_TOKEN_TTL_SECS,
            )?,
            refresh_access_token_ttl_secs: env_u64(
                "OAUTH_REFRESH_ACCESS_TOKEN_TTL",
                DEFAULT_REFRESH_ACCESS_TOKEN_TTL_SECS,
            )?,
            refresh_token_ttl_secs: env_u64(
                "OAUTH_REFRESH_TOKEN_TTL",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
            refresh_grant_enabled: env_bool("OAUTH_REFRESH_GRANT_ENABLED", true)?,
            rotate_refresh_tokens: env_bool("OAUTH_ROTATE_REFRESH_TOKENS", true)?,
            scope_delimiter,
            default_scope,
            scope_param_required: env_bool("OAUTH_SCOPE_PARAM_REQUIRED", false)?,
            exception_on_invalid_scope: env_bool("OAUTH_EXCEPTION_ON_INVALID_SCOPE", false)?,
            limit_clients_to_grants: env_bool("OAUTH_LIMIT_CLIENTS_TO_GRANTS", false)?,
            limit_clients_to_scopes: env_bool("OAUTH_LIMIT_CLIENTS_TO_SCOPES", false)?,
            limit_scopes_to_grants: env_bool("OAUTH_LIMIT_SCOPES_TO_GRANTS", false)?,
        };

        config.validate()?;
        debug!(
            refresh_grant_enabled = config.refresh_grant_enabled,
            rotate_refresh_tokens = config.rotate_refresh_tokens,
            "Grant server configuration loaded"
        );
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error on zero or oversized lifetimes, an empty delimiter, or an empty default scope
    pub fn validate(&self) -> Result<()> {
        for (name, ttl) in [
            ("password access token TTL", self.password_access_token_ttl_secs),
            ("refresh access token TTL", self.refresh_access_token_ttl_secs),
            ("refresh token TTL", self.refresh_token_ttl_secs),
        ] {
            if ttl == 0 {
                return Err(anyhow!("{name} must be greater than zero"));
            }
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(anyhow!(
                    "{name} must not exceed {MAX_TOKEN_TTL_SECS} seconds"
                ));
            }
        }

        if self.scope_delimiter.is_empty() {
            return Err(anyhow!("OAUTH_SCOPE_DELIMITER cannot be empty"));
        }

        if self
            .default_scope
            .as_ref()
            .is_some_and(|scopes| scopes.is_empty())
        {
            return Err(anyhow!("OAUTH_DEFAULT_SCOPE is set but lists no scopes"));
        }

        if self.scope_param_required && self.default_scope.is_some() {
            warn!("OAUTH_SCOPE_PARAM_REQUIRED has no effect while OAUTH_DEFAULT_SCOPE is set");
        }

        Ok(())
    }

    /// Access token lifetime for the password grant
    #[must_use]
    pub fn password_access_token_ttl(&self) -> Duration {
        seconds(self.password_access_token_ttl_secs)
    }

    /// Access token lifetime for the refresh grant
    #[must_use]
    pub fn refresh_access_token_ttl(&self) -> Duration {
        seconds(self.refresh_access_token_ttl_secs)
    }

    /// Refresh token lifetime
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        seconds(self.refresh_token_ttl_secs)
    }

    /// Scope negotiation settings
    #[must_use]
    pub fn scope_policy(&self) -> ScopePolicy {
        ScopePolicy {
            delimiter: self.scope_delimiter.clone(), // Safe: String ownership for policy
            default_scope: self.default_scope.clone(), // Safe: Vec ownership for policy
            scope_param_required: self.scope_param_required,
            exception_on_invalid_scope: self.exception_on_invalid_scope,
        }
    }

    /// Restrictions the storage backends enforce during lookups
    #[must_use]
    pub const fn restrictions(&self) -> StoreRestrictions {
        StoreRestrictions {
            limit_clients_to_grants: self.limit_clients_to_grants,
            limit_clients_to_scopes: self.limit_clients_to_scopes,
            limit_scopes_to_grants: self.limit_scopes_to_grants,
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs.min(MAX_TOKEN_TTL_SECS)).unwrap_or(0))
}
