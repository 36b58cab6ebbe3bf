// ABOUTME: Fire-and-forget audit events emitted by the grant flow
// ABOUTME: TracingEventSink forwards them to structured logs through AuditLogger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use scopegate_core::models::{GrantType, SessionOwner};
use scopegate_core::scopes::ScopeSet;

use crate::logging::AuditLogger;

/// Something worth auditing happened during a grant
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantEvent {
    /// Client id / secret did not authenticate for the grant
    ClientAuthenticationFailed {
        /// Client id that was presented
        client_id: String,
        /// Grant being attempted
        grant_type: GrantType,
    },
    /// Resource owner credentials were rejected
    UserAuthenticationFailed {
        /// Authenticated client making the attempt
        client_id: String,
        /// Username that was presented
        username: Option<String>,
        /// Email that was presented
        email: Option<String>,
    },
    /// A grant completed and tokens were persisted
    TokensIssued {
        /// Client the tokens belong to
        client_id: String,
        /// Grant that produced them
        grant_type: GrantType,
        /// Scopes on the new access token
        scopes: ScopeSet,
        /// Whether a refresh token was part of the response
        refresh_token_issued: bool,
    },
    /// Every token of an owner's sessions was expired
    SessionsRevoked {
        /// Owner whose sessions were revoked
        owner: SessionOwner,
        /// Number of sessions affected
        session_count: u64,
    },
}

/// Receiver of grant events
///
/// Implementations must not block; the flow never waits on or inspects the outcome.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: GrantEvent);
}

/// Event sink writing to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: GrantEvent) {
        match event {
            GrantEvent::ClientAuthenticationFailed {
                client_id,
                grant_type,
            } => AuditLogger::log_security_event(
                "client_authentication_failed",
                &format!("grant_type={grant_type}"),
                Some(&client_id),
            ),
            GrantEvent::UserAuthenticationFailed {
                client_id,
                username,
                email,
            } => AuditLogger::log_security_event(
                "user_authentication_failed",
                &format!(
                    "username={} email={}",
                    username.as_deref().unwrap_or("-"),
                    email.as_deref().unwrap_or("-")
                ),
                Some(&client_id),
            ),
            GrantEvent::TokensIssued {
                client_id,
                grant_type,
                scopes,
                refresh_token_issued,
            } => AuditLogger::log_token_issued(
                &client_id,
                grant_type.as_str(),
                &scopes.to_string(),
                refresh_token_issued,
            ),
            GrantEvent::SessionsRevoked {
                owner,
                session_count,
            } => AuditLogger::log_security_event(
                "sessions_revoked",
                &format!(
                    "owner_type={} owner_id={} sessions={session_count}",
                    owner.owner_type.as_str(),
                    owner.owner_id
                ),
                None,
            ),
        }
    }
}
