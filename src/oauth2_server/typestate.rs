// ABOUTME: Typestate grant flow making out-of-order grant steps compile errors
// ABOUTME: Start -> ClientAuthenticated -> CredentialsVerified | OldTokenValidated -> ScopesResolved -> TokensIssued
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use scopegate_core::constants::oauth::TOKEN_TYPE_BEARER;
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::{
    AccessToken, Client, GrantType, RefreshToken, Session, SessionOwner,
};
use scopegate_core::scopes::ScopeSet;
use tracing::warn;

use super::client_authenticator::ClientAuthenticator;
use super::credential_verifier::{CredentialVerifier, VerifiedCredentials};
use super::models::{TokenRequest, TokenResponse};
use super::scope_validator::ScopeValidator;
use super::token_issuer::TokenIssuer;
use crate::database_plugins::{GrantStores, RefreshRotation};
use crate::logging::redact_token;

// ============================================================================
// State Marker Types
// ============================================================================

/// Initial state: nothing has been checked
/// Valid transitions: -> `ClientAuthenticated`
#[derive(Debug)]
pub struct Start;

/// The client authenticated for the grant
/// Valid transitions: -> `CredentialsVerified` (password) | `OldTokenValidated` (refresh)
#[derive(Debug)]
pub struct ClientAuthenticated {
    client: Client,
}

/// Resource owner credentials checked (password grant)
/// Valid transitions: -> `ScopesResolved`
#[derive(Debug)]
pub struct CredentialsVerified {
    client: Client,
    credentials: VerifiedCredentials,
}

/// Presented refresh token is active and traced back to its session (refresh grant)
/// Valid transitions: -> `ScopesResolved`
#[derive(Debug)]
pub struct OldTokenValidated {
    client: Client,
    refresh_token: RefreshToken,
    access_token: AccessToken,
    session: Session,
}

/// How the resolved grant will be written
#[derive(Debug)]
enum WritePlan {
    NewSession,
    Refresh {
        old_refresh_token: RefreshToken,
        old_access_token_id: String,
    },
}

/// Scopes settled and the session known
/// Valid transitions: -> `TokensIssued`
#[derive(Debug)]
pub struct ScopesResolved {
    client: Client,
    session: Session,
    scopes: ScopeSet,
    plan: WritePlan,
}

/// Tokens minted and persisted
/// Valid transitions: -> `TokenResponse`
#[derive(Debug)]
pub struct TokensIssued {
    client: Client,
    access_token: AccessToken,
    refresh_token_id: Option<String>,
}

// ============================================================================
// Grant Flow with Typestate
// ============================================================================

/// One grant evaluation, advanced step by step
///
/// Each transition consumes the flow, so a step cannot be skipped or
/// repeated. Any failure ends the evaluation with a `GrantError`.
#[derive(Debug)]
pub struct GrantFlow<State> {
    grant_type: GrantType,
    now: DateTime<Utc>,
    state: State,
}

impl<State> GrantFlow<State> {
    /// Grant being evaluated
    #[must_use]
    pub const fn grant_type(&self) -> GrantType {
        self.grant_type
    }

    /// Instant the grant is evaluated at
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn advance<Next>(self, state: Next) -> GrantFlow<Next> {
        GrantFlow {
            grant_type: self.grant_type,
            now: self.now,
            state,
        }
    }
}

impl GrantFlow<Start> {
    /// Begin evaluating `grant_type` at `now`
    #[must_use]
    pub const fn new(grant_type: GrantType, now: DateTime<Utc>) -> Self {
        Self {
            grant_type,
            now,
            state: Start,
        }
    }

    /// Authenticate the client; missing parameters fail before any store call
    ///
    /// # Errors
    ///
    /// `InvalidRequest("client_id" | "client_secret")`, `InvalidClient`, or `Storage`
    pub async fn authenticate_client(
        self,
        authenticator: &ClientAuthenticator,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> GrantResult<GrantFlow<ClientAuthenticated>> {
        let client_id = client_id.ok_or_else(|| GrantError::invalid_request("client_id"))?;
        let client_secret =
            client_secret.ok_or_else(|| GrantError::invalid_request("client_secret"))?;

        let client = authenticator
            .authenticate(client_id, client_secret, self.grant_type)
            .await?;
        Ok(self.advance(ClientAuthenticated { client }))
    }
}

impl GrantFlow<ClientAuthenticated> {
    /// Authenticated client
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.state.client
    }

    /// Verify the resource owner (password grant)
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, `InvalidCredentials`, or `Storage`
    pub async fn verify_credentials(
        self,
        verifier: &CredentialVerifier,
        request: &TokenRequest,
    ) -> GrantResult<GrantFlow<CredentialsVerified>> {
        let credentials = verifier
            .verify(
                &self.state.client.client_id,
                request.username.as_deref(),
                request.email.as_deref(),
                request.password.as_deref(),
            )
            .await?;
        let client = self.state.client.clone();
        Ok(self.advance(CredentialsVerified {
            client,
            credentials,
        }))
    }

    /// Validate the presented refresh token and trace it to its session (refresh grant)
    ///
    /// # Errors
    ///
    /// `InvalidRequest("refresh_token")` when absent, `InvalidRefresh` when the
    /// token is unknown, revoked, expired, orphaned, or belongs to another client
    pub async fn validate_refresh_token(
        self,
        stores: &GrantStores,
        refresh_token: Option<&str>,
    ) -> GrantResult<GrantFlow<OldTokenValidated>> {
        let token_id =
            refresh_token.ok_or_else(|| GrantError::invalid_request("refresh_token"))?;
        let client_id = self.state.client.client_id.as_str();
        let rejected = |reason: &str| {
            warn!(
                client_id = %client_id,
                refresh_token = %redact_token(token_id),
                "Refresh token rejected: {}",
                reason
            );
            GrantError::InvalidRefresh
        };

        let refresh_token = stores
            .refresh_tokens
            .get_refresh_token(token_id)
            .await?
            .ok_or_else(|| rejected("unknown"))?;
        if refresh_token.revoked_at.is_some() {
            return Err(rejected("revoked"));
        }
        if refresh_token.is_expired_at(self.now) {
            return Err(rejected("expired"));
        }

        let access_token = stores
            .tokens
            .get_access_token(&refresh_token.access_token_id)
            .await?
            .ok_or_else(|| rejected("access token missing"))?;
        let session = stores
            .sessions
            .get_session(access_token.session_id)
            .await?
            .ok_or_else(|| rejected("session missing"))?;
        if session.client_id != client_id {
            return Err(rejected("issued to another client"));
        }

        let client = self.state.client.clone();
        Ok(self.advance(OldTokenValidated {
            client,
            refresh_token,
            access_token,
            session,
        }))
    }
}

impl GrantFlow<CredentialsVerified> {
    /// Verified resource owner
    #[must_use]
    pub const fn credentials(&self) -> &VerifiedCredentials {
        &self.state.credentials
    }

    /// Negotiate scopes against the owner's allowed set and open a session
    ///
    /// # Errors
    ///
    /// `InvalidScope`, `InvalidRequest("scope")`, or `Storage`
    pub async fn resolve_scopes(
        self,
        validator: &ScopeValidator,
        requested: Option<&str>,
    ) -> GrantResult<GrantFlow<ScopesResolved>> {
        let CredentialsVerified {
            client,
            credentials,
        } = &self.state;
        let scopes = validator
            .validate(
                requested,
                Some(&credentials.allowed_scopes),
                self.grant_type,
                &client.client_id,
            )
            .await?;

        let session = Session::new_at(
            SessionOwner::user(credentials.user_id),
            client.client_id.clone(), // Safe: session owns its client id
            scopes.clone(),
            self.now,
        );
        let client = client.clone();
        Ok(self.advance(ScopesResolved {
            client,
            session,
            scopes,
            plan: WritePlan::NewSession,
        }))
    }
}

impl GrantFlow<OldTokenValidated> {
    /// Session the presented refresh token belongs to
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.state.session
    }

    /// Narrow (or keep) the original session scopes
    ///
    /// # Errors
    ///
    /// `InvalidScope` for any scope outside the original session, or `Storage`
    pub async fn resolve_scopes(
        self,
        validator: &ScopeValidator,
        requested: Option<&str>,
    ) -> GrantResult<GrantFlow<ScopesResolved>> {
        let scopes = validator
            .validate_subset(
                requested,
                &self.state.session.scopes,
                self.grant_type,
                &self.state.client.client_id,
            )
            .await?;

        let OldTokenValidated {
            client,
            refresh_token,
            access_token,
            session,
        } = &self.state;
        let resolved = ScopesResolved {
            client: client.clone(),
            session: session.clone(),
            scopes,
            plan: WritePlan::Refresh {
                old_refresh_token: refresh_token.clone(),
                old_access_token_id: access_token.id.clone(),
            },
        };
        Ok(self.advance(resolved))
    }
}

impl GrantFlow<ScopesResolved> {
    /// Scopes the new access token will carry
    #[must_use]
    pub const fn scopes(&self) -> &ScopeSet {
        &self.state.scopes
    }

    /// Mint the tokens and persist them atomically
    ///
    /// # Errors
    ///
    /// `Internal` if minting fails, `InvalidRefresh` if a concurrent refresh
    /// consumed the token first, or `Storage`
    pub async fn issue_tokens(self, issuer: &TokenIssuer) -> GrantResult<GrantFlow<TokensIssued>> {
        let lifetimes = *issuer.lifetimes();
        let now = self.now;
        let ScopesResolved {
            client,
            session,
            scopes,
            plan,
        } = &self.state;

        let (access_token, refresh_token_id) = match plan {
            WritePlan::NewSession => {
                let access_token =
                    issuer.issue(session, lifetimes.password_access_ttl, scopes.clone(), now)?;
                let refresh_token = if lifetimes.issue_refresh_tokens {
                    Some(issuer.issue_refresh(&access_token, lifetimes.refresh_ttl, now)?)
                } else {
                    None
                };
                issuer
                    .persist_new_session(session, &access_token, refresh_token.as_ref())
                    .await?;
                (access_token, refresh_token.map(|token| token.id))
            }
            WritePlan::Refresh {
                old_refresh_token,
                old_access_token_id,
            } => {
                let access_token =
                    issuer.issue(session, lifetimes.refresh_access_ttl, scopes.clone(), now)?;
                let new_refresh_token = if lifetimes.rotate_refresh_tokens {
                    Some(issuer.issue_refresh(&access_token, lifetimes.refresh_ttl, now)?)
                } else {
                    None
                };
                let refresh_token_id = new_refresh_token
                    .as_ref()
                    .map_or_else(|| old_refresh_token.id.clone(), |token| token.id.clone());

                let rotation = RefreshRotation {
                    old_refresh_token_id: old_refresh_token.id.clone(),
                    old_access_token_id: old_access_token_id.clone(),
                    new_access_token: access_token.clone(),
                    new_refresh_token,
                };
                issuer.persist_rotation(&rotation, now).await?;
                (access_token, Some(refresh_token_id))
            }
        };

        let client = client.clone();
        Ok(self.advance(TokensIssued {
            client,
            access_token,
            refresh_token_id,
        }))
    }
}

impl GrantFlow<TokensIssued> {
    /// Client the tokens were issued to
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.state.client
    }

    /// Persisted access token
    #[must_use]
    pub const fn access_token(&self) -> &AccessToken {
        &self.state.access_token
    }

    /// Whether the response carries a refresh token
    #[must_use]
    pub const fn has_refresh_token(&self) -> bool {
        self.state.refresh_token_id.is_some()
    }

    /// Build the token response
    #[must_use]
    pub fn into_response(self) -> TokenResponse {
        let TokensIssued {
            access_token,
            refresh_token_id,
            ..
        } = self.state;
        TokenResponse {
            expires_in: access_token.expires_in(self.now),
            access_token: access_token.id,
            token_type: TOKEN_TYPE_BEARER.to_owned(),
            refresh_token: refresh_token_id,
            scopes: access_token.scopes.into_ids(),
        }
    }
}
