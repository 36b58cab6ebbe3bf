// ABOUTME: Unit tests for grant request, response, and error payload models
// ABOUTME: Validates OAuth 2.0 error mapping and JSON shapes of the wire types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use scopegate::errors::{DatabaseError, GrantError};
use scopegate::oauth2_server::{OAuth2Error, TokenRequest, TokenResponse};
use serde_json::json;

// =============================================================================
// OAuth2Error Tests
// =============================================================================

#[test]
fn test_invalid_request_names_the_parameter() {
    let error = OAuth2Error::from(GrantError::invalid_request("client_id"));

    assert_eq!(error.error, "invalid_request");
    assert!(error
        .error_description
        .as_deref()
        .unwrap()
        .contains("\"client_id\""));
    assert!(error.error_uri.unwrap().contains("rfc6749"));
}

#[test]
fn test_invalid_refresh_shares_the_invalid_request_code() {
    let error = OAuth2Error::from(&GrantError::InvalidRefresh);
    assert_eq!(error.error, "invalid_request");
    assert_eq!(
        error.error_description.as_deref(),
        Some("The refresh token is invalid.")
    );
}

#[test]
fn test_access_denied_points_at_bearer_rfc() {
    let error = OAuth2Error::from(&GrantError::AccessDenied);
    assert_eq!(error.error, "access_denied");
    assert!(error.error_uri.unwrap().contains("rfc6750"));
}

#[test]
fn test_server_errors_hide_details() {
    let storage = GrantError::Storage(DatabaseError::ConnectionError(
        "disk I/O error at /var/lib/secret".to_owned(),
    ));
    let error = OAuth2Error::from(&storage);

    assert_eq!(error.error, "server_error");
    assert!(error.error_uri.is_none());
    assert!(!error
        .error_description
        .as_deref()
        .unwrap()
        .contains("/var/lib"));
    assert_eq!(storage.http_status(), 500);
    assert!(!storage.is_client_error());
}

#[test]
fn test_error_payload_serialization_skips_missing_fields() {
    let error = OAuth2Error {
        error: "invalid_client".to_owned(),
        error_description: None,
        error_uri: None,
    };
    let value = serde_json::to_value(&error).unwrap();
    assert_eq!(value, json!({ "error": "invalid_client" }));
}

#[test]
fn test_every_client_error_maps_to_a_4xx_status() {
    let errors = [
        GrantError::invalid_request("scope"),
        GrantError::InvalidClient,
        GrantError::InvalidCredentials,
        GrantError::invalid_scope("admin"),
        GrantError::InvalidRefresh,
        GrantError::unsupported_grant_type("implicit"),
        GrantError::AccessDenied,
    ];
    for error in errors {
        assert!(error.is_client_error());
        assert!((400..500).contains(&error.http_status()), "{error:?}");
    }
}

// =============================================================================
// TokenRequest / TokenResponse Tests
// =============================================================================

#[test]
fn test_token_request_from_form_params() {
    let request: TokenRequest = serde_json::from_value(json!({
        "grant_type": "password",
        "client_id": "client1",
        "client_secret": "client1secret",
        "email": "new.test.user@example.com",
        "password": "aUserPassword",
        "scope": "user,admin"
    }))
    .unwrap();

    assert_eq!(request.grant_type.as_deref(), Some("password"));
    assert!(request.username.is_none());
    assert_eq!(request.email.as_deref(), Some("new.test.user@example.com"));
    assert!(request.refresh_token.is_none());
}

#[test]
fn test_token_request_builders() {
    let request = TokenRequest::refresh("client1", "client1secret", "rt").with_scope("user");
    assert_eq!(request.grant_type.as_deref(), Some("refresh_token"));
    assert_eq!(request.refresh_token.as_deref(), Some("rt"));
    assert_eq!(request.scope.as_deref(), Some("user"));
    assert!(request.password.is_none());
}

#[test]
fn test_token_response_json_shape() {
    let response = TokenResponse {
        access_token: "at".to_owned(),
        token_type: "Bearer".to_owned(),
        expires_in: 7600,
        refresh_token: None,
        scopes: vec!["user".to_owned()],
    };
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(
        value,
        json!({
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 7600,
            "scopes": ["user"]
        })
    );
}
