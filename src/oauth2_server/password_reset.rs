// ABOUTME: Password reset tokens and password changes for resource owners
// ABOUTME: Only a SHA-256 digest of the reset token is stored; a change revokes every session of the agent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use scopegate_core::constants::oauth::PASSWORD_RESET_TOKEN_BYTES;
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::SessionOwner;
use tracing::{info, warn};
use uuid::Uuid;

use super::resource_guard::ResourceGuard;
use crate::crypto::{constant_time_eq, generate_random_string, hash_password_blocking, sha256_hex};
use crate::database_plugins::UserStore;

/// Issues reset tokens and changes agent passwords
#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserStore>,
    guard: ResourceGuard,
    bcrypt_cost: u32,
}

impl PasswordResetService {
    /// Create a service hashing new passwords at bcrypt's default cost
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, guard: ResourceGuard) -> Self {
        Self::with_cost(users, guard, bcrypt::DEFAULT_COST)
    }

    /// Create a service hashing new passwords at `bcrypt_cost`
    #[must_use]
    pub fn with_cost(users: Arc<dyn UserStore>, guard: ResourceGuard, bcrypt_cost: u32) -> Self {
        Self {
            users,
            guard,
            bcrypt_cost,
        }
    }

    /// Generate a reset token for `agent_id` and store its digest
    ///
    /// The plain token is returned once and never stored.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown agent, `Internal` if the RNG fails, or `Storage`
    pub async fn generate_reset_token(&self, agent_id: Uuid) -> GrantResult<String> {
        if self.users.get_agent(agent_id).await?.is_none() {
            return Err(GrantError::InvalidCredentials);
        }
        let token = generate_random_string(PASSWORD_RESET_TOKEN_BYTES)?;
        self.users
            .set_password_reset_token(agent_id, Some(&sha256_hex(&token)))
            .await?;
        info!(user_id = %agent_id, "Password reset token generated");
        Ok(token)
    }

    /// Replace the password of `agent_id` when `reset_token` matches
    ///
    /// Clears the reset token in the same write that stores the new hash, so
    /// concurrent changes with one token succeed at most once. Revokes every
    /// session of the agent and returns the number of sessions revoked.
    ///
    /// # Errors
    ///
    /// `InvalidRequest("password")` for an empty password, `InvalidCredentials`
    /// for an unknown agent or a wrong or missing reset token, `Internal` if
    /// hashing fails, or `Storage`
    pub async fn change_password(
        &self,
        agent_id: Uuid,
        reset_token: &str,
        new_password: &str,
    ) -> GrantResult<u64> {
        if new_password.is_empty() {
            return Err(GrantError::invalid_request("password"));
        }
        let agent = self
            .users
            .get_agent(agent_id)
            .await?
            .ok_or(GrantError::InvalidCredentials)?;

        let token_digest = sha256_hex(reset_token);
        let token_matches = agent
            .password_reset_token_hash
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored, &token_digest));
        if !token_matches {
            warn!(user_id = %agent_id, "Password change rejected: reset token mismatch");
            return Err(GrantError::InvalidCredentials);
        }

        let password_hash =
            hash_password_blocking(new_password.to_owned(), self.bcrypt_cost).await?;
        if !self
            .users
            .reset_password(agent_id, &token_digest, &password_hash)
            .await?
        {
            warn!(user_id = %agent_id, "Password change rejected: reset token already used");
            return Err(GrantError::InvalidCredentials);
        }

        let revoked = self
            .guard
            .revoke_sessions_for_owner(&SessionOwner::user(agent_id))
            .await?;
        info!(user_id = %agent_id, sessions_revoked = revoked, "Password changed");
        Ok(revoked)
    }
}
