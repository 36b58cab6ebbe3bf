// ABOUTME: Verifies resource owner username/email and password for the password grant
// ABOUTME: Unknown user and wrong password collapse into one invalid_credentials outcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::scopes::ScopeSet;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::{EventSink, GrantEvent};
use crate::database_plugins::UserStore;

/// Outcome of a successful credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredentials {
    /// Agent the credentials belong to
    pub user_id: Uuid,
    /// Scopes the agent may be granted
    pub allowed_scopes: ScopeSet,
}

/// Resource owner credential verification against a `UserStore`
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventSink>,
}

impl CredentialVerifier {
    /// Create a verifier over `users`
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, events: Arc<dyn EventSink>) -> Self {
        Self { users, events }
    }

    /// Verify resource owner credentials presented through `client_id`
    ///
    /// When both `username` and `email` are supplied they must identify the same agent.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest("username, email")` when neither identifier is present
    /// - `InvalidRequest("password")` when the password is missing
    /// - `InvalidCredentials` when no agent matches or the password is wrong
    /// - `Storage` when the user store fails
    pub async fn verify(
        &self,
        client_id: &str,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> GrantResult<VerifiedCredentials> {
        if username.is_none() && email.is_none() {
            return Err(GrantError::invalid_request("username, email"));
        }
        let password = password.ok_or_else(|| GrantError::invalid_request("password"))?;

        let agent = self.users.find_by_username_or_email(username, email).await?;
        let verified = match agent {
            Some(agent) if self.users.check_password(&agent, password).await => Some(agent),
            _ => None,
        };

        let Some(agent) = verified else {
            warn!(client_id = %client_id, "Resource owner authentication failed");
            self.events.emit(GrantEvent::UserAuthenticationFailed {
                client_id: client_id.to_owned(),
                username: username.map(str::to_owned),
                email: email.map(str::to_owned),
            });
            return Err(GrantError::InvalidCredentials);
        };

        let allowed_scopes = self.users.scopes_for(&agent).await?;
        debug!(client_id = %client_id, user_id = %agent.id, "Resource owner authenticated");

        Ok(VerifiedCredentials {
            user_id: agent.id,
            allowed_scopes,
        })
    }
}
