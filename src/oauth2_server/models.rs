// ABOUTME: Grant request, token response, and RFC 6749 error payload types
// ABOUTME: Transport-neutral; a caller deserializes form params into TokenRequest and serializes the results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use scopegate_core::constants::oauth::{
    GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN, RFC6749_TOKEN_ERROR_URI,
    RFC6750_BEARER_ERROR_URI,
};
use scopegate_core::errors::GrantError;
use serde::{Deserialize, Serialize};

/// OAuth 2.0 token request parameters
///
/// Every field is optional so that missing parameters surface as
/// `invalid_request` errors naming the field instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenRequest {
    /// Grant type (`password` or `refresh_token`)
    pub grant_type: Option<String>,
    /// Client ID
    pub client_id: Option<String>,
    /// Client secret
    pub client_secret: Option<String>,
    /// Resource owner username (password grant)
    pub username: Option<String>,
    /// Resource owner email (password grant)
    pub email: Option<String>,
    /// Resource owner password (password grant)
    pub password: Option<String>,
    /// Delimiter-separated requested scopes
    pub scope: Option<String>,
    /// Refresh token (refresh token grant)
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    /// Password grant request identified by username
    #[must_use]
    pub fn password(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: Some(GRANT_TYPE_PASSWORD.to_owned()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Refresh token grant request
    #[must_use]
    pub fn refresh(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: Some(GRANT_TYPE_REFRESH_TOKEN.to_owned()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Set the requested scope string
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// OAuth 2.0 token response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    /// Refresh token, when the refresh grant is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope ids in grant order
    pub scopes: Vec<String>,
}

/// OAuth 2.0 Error Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// URI for error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl From<&GrantError> for OAuth2Error {
    fn from(error: &GrantError) -> Self {
        let (error_description, error_uri) = if error.is_client_error() {
            let uri = if matches!(error, GrantError::AccessDenied) {
                RFC6750_BEARER_ERROR_URI
            } else {
                RFC6749_TOKEN_ERROR_URI
            };
            (error.to_string(), Some(uri.to_owned()))
        } else {
            // Storage and internal details stay in the logs
            ("The server encountered an unexpected condition".to_owned(), None)
        };

        Self {
            error: error.error_code().to_owned(),
            error_description: Some(error_description),
            error_uri,
        }
    }
}

impl From<GrantError> for OAuth2Error {
    fn from(error: GrantError) -> Self {
        Self::from(&error)
    }
}
