// ABOUTME: Grant server entry point dispatching password and refresh token grants
// ABOUTME: Drives the typestate flow and emits an audit event for every issued token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::GrantType;
use tracing::{debug, instrument, warn};

use super::client_authenticator::ClientAuthenticator;
use super::credential_verifier::CredentialVerifier;
use super::events::{EventSink, GrantEvent, TracingEventSink};
use super::models::{TokenRequest, TokenResponse};
use super::resource_guard::ResourceGuard;
use super::scope_validator::ScopeValidator;
use super::token_issuer::{TokenIssuer, TokenLifetimes};
use super::typestate::{GrantFlow, TokensIssued};
use crate::config::GrantServerConfig;
use crate::database_plugins::GrantStores;

/// OAuth 2.0 grant server for the password and refresh token grants
#[derive(Clone)]
pub struct OAuth2GrantServer {
    config: Arc<GrantServerConfig>,
    stores: GrantStores,
    client_authenticator: ClientAuthenticator,
    credential_verifier: CredentialVerifier,
    scope_validator: ScopeValidator,
    token_issuer: TokenIssuer,
    events: Arc<dyn EventSink>,
}

impl OAuth2GrantServer {
    /// Assemble a server from configuration, stores, and an event sink
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`GrantServerConfig::validate`]
    pub fn new(
        config: GrantServerConfig,
        stores: GrantStores,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let client_authenticator = ClientAuthenticator::new(stores.clients.clone(), events.clone()); // Safe: Arc clones for collaborators
        let credential_verifier = CredentialVerifier::new(stores.users.clone(), events.clone());
        let scope_validator = ScopeValidator::new(stores.scopes.clone(), config.scope_policy());
        let token_issuer = TokenIssuer::new(stores.tokens.clone(), TokenLifetimes::from(&config));

        Ok(Self {
            config: Arc::new(config),
            stores,
            client_authenticator,
            credential_verifier,
            scope_validator,
            token_issuer,
            events,
        })
    }

    /// Assemble a server that logs grant events through `tracing`
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`GrantServerConfig::validate`]
    pub fn with_tracing_events(config: GrantServerConfig, stores: GrantStores) -> Result<Self> {
        Self::new(config, stores, Arc::new(TracingEventSink))
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &GrantServerConfig {
        &self.config
    }

    /// Resource guard sharing this server's stores and event sink
    #[must_use]
    pub fn resource_guard(&self) -> ResourceGuard {
        ResourceGuard::new(&self.stores, self.events.clone())
    }

    /// Complete a token request now
    ///
    /// # Errors
    ///
    /// Returns the `GrantError` that ended the grant; client errors are
    /// non-retryable and leave nothing persisted
    pub async fn complete_grant(&self, request: &TokenRequest) -> GrantResult<TokenResponse> {
        self.complete_grant_at(request, Utc::now()).await
    }

    /// Complete a token request as of `now`
    ///
    /// # Errors
    ///
    /// See [`Self::complete_grant`]
    #[instrument(
        skip(self, request),
        fields(grant_type = request.grant_type.as_deref().unwrap_or("-"), client_id = request.client_id.as_deref().unwrap_or("-"))
    )]
    pub async fn complete_grant_at(
        &self,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> GrantResult<TokenResponse> {
        let grant_type = self.resolve_grant_type(request.grant_type.as_deref())?;

        let result = match grant_type {
            GrantType::Password => self.password_grant(request, now).await,
            GrantType::RefreshToken => self.refresh_token_grant(request, now).await,
        };

        match result {
            Ok(issued) => Ok(self.finish(issued)),
            Err(error) => {
                if error.is_client_error() {
                    debug!(error_code = error.error_code(), "Grant rejected: {}", error);
                } else {
                    warn!(error_code = error.error_code(), "Grant failed: {}", error);
                }
                Err(error)
            }
        }
    }

    fn resolve_grant_type(&self, grant_type: Option<&str>) -> GrantResult<GrantType> {
        let grant_type: GrantType = grant_type
            .ok_or_else(|| GrantError::invalid_request("grant_type"))?
            .parse()?;
        if grant_type == GrantType::RefreshToken && !self.config.refresh_grant_enabled {
            return Err(GrantError::unsupported_grant_type(grant_type.as_str()));
        }
        Ok(grant_type)
    }

    async fn password_grant(
        &self,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> GrantResult<GrantFlow<TokensIssued>> {
        GrantFlow::new(GrantType::Password, now)
            .authenticate_client(
                &self.client_authenticator,
                request.client_id.as_deref(),
                request.client_secret.as_deref(),
            )
            .await?
            .verify_credentials(&self.credential_verifier, request)
            .await?
            .resolve_scopes(&self.scope_validator, request.scope.as_deref())
            .await?
            .issue_tokens(&self.token_issuer)
            .await
    }

    async fn refresh_token_grant(
        &self,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> GrantResult<GrantFlow<TokensIssued>> {
        GrantFlow::new(GrantType::RefreshToken, now)
            .authenticate_client(
                &self.client_authenticator,
                request.client_id.as_deref(),
                request.client_secret.as_deref(),
            )
            .await?
            .validate_refresh_token(&self.stores, request.refresh_token.as_deref())
            .await?
            .resolve_scopes(&self.scope_validator, request.scope.as_deref())
            .await?
            .issue_tokens(&self.token_issuer)
            .await
    }

    fn finish(&self, issued: GrantFlow<TokensIssued>) -> TokenResponse {
        self.events.emit(GrantEvent::TokensIssued {
            client_id: issued.client().client_id.clone(),
            grant_type: issued.grant_type(),
            scopes: issued.access_token().scopes.clone(),
            refresh_token_issued: issued.has_refresh_token(),
        });
        issued.into_response()
    }
}
