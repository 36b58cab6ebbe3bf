// ABOUTME: Grant flow error taxonomy with OAuth 2.0 error codes and HTTP status mapping
// ABOUTME: Client errors are non-retryable; storage and internal failures are fatal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::database::DatabaseError;

/// Errors returned by the password and refresh token grants
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    /// A required parameter was missing or malformed
    #[error(
        "The request is missing a required parameter, includes an invalid parameter value, \
         includes a parameter more than once, or is otherwise malformed. Check the \"{field}\" parameter."
    )]
    InvalidRequest {
        /// Name of the offending parameter
        field: String,
    },

    /// Client authentication failed
    #[error("Client authentication failed.")]
    InvalidClient,

    /// The user credentials were incorrect
    #[error("The user credentials were incorrect.")]
    InvalidCredentials,

    /// A requested scope is unknown, not allowed, or not a subset of the original grant
    #[error("The requested scope is invalid, unknown, or malformed. Check the \"{scope}\" scope.")]
    InvalidScope {
        /// The offending scope id
        scope: String,
    },

    /// The refresh token is unknown, expired, or already used
    #[error("The refresh token is invalid.")]
    InvalidRefresh,

    /// The grant type is unknown or disabled
    #[error("The authorization grant type \"{grant_type}\" is not supported by the authorization server.")]
    UnsupportedGrantType {
        /// The requested grant type
        grant_type: String,
    },

    /// A bearer token was rejected or lacks the required scopes
    #[error("The resource owner or authorization server denied the request.")]
    AccessDenied,

    /// The storage backend failed
    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),

    /// An internal invariant failed (RNG, hashing)
    #[error("Internal error: {reason}")]
    Internal {
        /// Description of the failure
        reason: String,
    },
}

impl GrantError {
    /// Create an `InvalidRequest` error for a parameter
    #[must_use]
    pub fn invalid_request(field: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
        }
    }

    /// Create an `InvalidScope` error for a scope id
    #[must_use]
    pub fn invalid_scope(scope: impl Into<String>) -> Self {
        Self::InvalidScope {
            scope: scope.into(),
        }
    }

    /// Create an `UnsupportedGrantType` error
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Create an `Internal` error
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// OAuth 2.0 error code for the wire payload
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidRefresh => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::AccessDenied => "access_denied",
            Self::Storage(_) | Self::Internal { .. } => "server_error",
        }
    }

    /// HTTP status a transport layer should answer with
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient | Self::InvalidCredentials | Self::AccessDenied => 401,
            Self::InvalidRequest { .. }
            | Self::InvalidScope { .. }
            | Self::InvalidRefresh
            | Self::UnsupportedGrantType { .. } => 400,
            Self::Storage(_) | Self::Internal { .. } => 500,
        }
    }

    /// Whether the error was caused by the request rather than the server
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal { .. })
    }
}
