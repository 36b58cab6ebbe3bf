// ABOUTME: OAuth 2.0 password and refresh token grant engine
// ABOUTME: Client authentication, credential checks, scope negotiation, token issuance, and resource guarding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Client id / secret authentication
pub mod client_authenticator;
/// Resource owner credential verification
pub mod credential_verifier;
/// Grant server entry point
pub mod endpoints;
/// Audit events
pub mod events;
/// Request, response, and error payloads
pub mod models;
/// Password reset tokens and password changes
pub mod password_reset;
/// Bearer token validation and scope checks
pub mod resource_guard;
/// Scope negotiation
pub mod scope_validator;
/// Token minting and persistence
pub mod token_issuer;
/// Typestate pattern for compile-time grant flow safety
pub mod typestate;

pub use client_authenticator::ClientAuthenticator;
pub use credential_verifier::{CredentialVerifier, VerifiedCredentials};
pub use endpoints::OAuth2GrantServer;
pub use events::{EventSink, GrantEvent, TracingEventSink};
pub use models::{OAuth2Error, TokenRequest, TokenResponse};
pub use password_reset::PasswordResetService;
pub use resource_guard::{extract_bearer, AuthenticatedAgent, ResourceGuard};
pub use scope_validator::{ScopePolicy, ScopeValidator};
pub use token_issuer::{TokenIssuer, TokenLifetimes};

// Grant typestate
/// Grant flow with compile-time state transitions
pub use typestate::GrantFlow;
/// Client authenticated state
pub use typestate::ClientAuthenticated;
/// Resource owner verified state (password grant)
pub use typestate::CredentialsVerified;
/// Refresh token validated state (refresh grant)
pub use typestate::OldTokenValidated;
/// Scopes resolved state
pub use typestate::ScopesResolved;
/// Initial grant state
pub use typestate::Start;
/// Tokens persisted state
pub use typestate::TokensIssued;
