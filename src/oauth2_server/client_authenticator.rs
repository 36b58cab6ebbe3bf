// ABOUTME: Authenticates OAuth 2.0 clients by id, secret, and requested grant
// ABOUTME: Failures emit ClientAuthenticationFailed and map to invalid_client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::{Client, GrantType};
use tracing::{debug, warn};

use super::events::{EventSink, GrantEvent};
use crate::database_plugins::ClientStore;

/// Client authentication against a `ClientStore`
#[derive(Clone)]
pub struct ClientAuthenticator {
    clients: Arc<dyn ClientStore>,
    events: Arc<dyn EventSink>,
}

impl ClientAuthenticator {
    /// Create an authenticator over `clients`
    #[must_use]
    pub fn new(clients: Arc<dyn ClientStore>, events: Arc<dyn EventSink>) -> Self {
        Self { clients, events }
    }

    /// Authenticate a client for `grant_type`
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidClient` for an unknown client, a wrong secret,
    /// or a grant the client may not use; `GrantError::Storage` if the lookup fails
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
        grant_type: GrantType,
    ) -> GrantResult<Client> {
        if let Some(client) = self
            .clients
            .get_client(client_id, client_secret, grant_type)
            .await?
        {
            debug!(client_id = %client_id, grant_type = %grant_type, "Client authenticated");
            return Ok(client);
        }

        warn!(client_id = %client_id, grant_type = %grant_type, "Client authentication failed");
        self.events.emit(GrantEvent::ClientAuthenticationFailed {
            client_id: client_id.to_owned(),
            grant_type,
        });
        Err(GrantError::InvalidClient)
    }
}
