// ABOUTME: Integration tests for the resource owner password credentials grant
// ABOUTME: Covers client and user authentication, scope negotiation, and persisted token records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{
    create_memory_server, create_memory_store, password_request, CountingStore,
    RecordingEventSink, CLIENT_ID, CLIENT_SECRET, EMAIL, PASSWORD, USERNAME,
};
use chrono::{Duration, Utc};
use scopegate::config::GrantServerConfig;
use scopegate::database_plugins::{GrantStores, SessionStore, StoreRestrictions, TokenStore};
use scopegate::errors::GrantError;
use scopegate::models::{GrantType, SessionOwner};
use scopegate::oauth2_server::{GrantEvent, OAuth2GrantServer, TokenRequest};

#[tokio::test]
async fn test_password_grant_issues_access_and_refresh_tokens() {
    let (server, store, events) = create_memory_server(GrantServerConfig::default());

    let response = server
        .complete_grant(&password_request(Some("user,admin")))
        .await
        .unwrap();

    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 7600);
    assert_eq!(response.access_token.len(), 43);
    assert_eq!(response.scopes, vec!["user", "admin"]);
    let refresh_token = response.refresh_token.expect("refresh token issued");
    assert_ne!(refresh_token, response.access_token);

    assert_eq!(store.session_count().await, 1);
    assert_eq!(store.access_token_count().await, 1);
    assert_eq!(store.refresh_token_count().await, 1);

    let access_token = store
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();
    let session = store
        .get_session(access_token.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.client_id, CLIENT_ID);
    assert_eq!(session.scopes.ids(), ["user", "admin"]);
    assert!(access_token.scopes.is_subset_of(&session.scopes));

    assert!(events.events().iter().any(|event| matches!(
        event,
        GrantEvent::TokensIssued {
            grant_type: GrantType::Password,
            refresh_token_issued: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_password_grant_by_email() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest {
        username: None,
        email: Some(EMAIL.to_owned()),
        ..password_request(Some("user"))
    };

    let response = server.complete_grant(&request).await.unwrap();
    assert_eq!(response.scopes, vec!["user"]);
}

#[tokio::test]
async fn test_username_and_email_must_identify_the_same_user() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest {
        email: Some("someone.else@example.com".to_owned()),
        ..password_request(Some("user"))
    };

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidCredentials);
}

#[tokio::test]
async fn test_wrong_password_is_rejected_and_audited() {
    let (server, store, events) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, USERNAME, "notThePassword");

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidCredentials);
    assert_eq!(error.http_status(), 401);
    assert_eq!(store.session_count().await, 0);

    assert!(events.events().iter().any(|event| matches!(
        event,
        GrantEvent::UserAuthenticationFailed { username: Some(name), .. } if name == USERNAME
    )));
}

#[tokio::test]
async fn test_unknown_user_is_rejected() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, "nobody", PASSWORD);

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidCredentials);
}

#[tokio::test]
async fn test_wrong_client_secret_is_invalid_client() {
    let (server, store, events) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest::password(CLIENT_ID, "wrong-secret", USERNAME, PASSWORD);

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidClient);
    assert_eq!(store.access_token_count().await, 0);
    assert_eq!(
        events.events(),
        vec![GrantEvent::ClientAuthenticationFailed {
            client_id: CLIENT_ID.to_owned(),
            grant_type: GrantType::Password,
        }]
    );
}

#[tokio::test]
async fn test_missing_parameters_fail_before_any_store_call() {
    let (inner, _) = create_memory_store(StoreRestrictions::default());
    let counting = Arc::new(CountingStore::new(inner));
    let server = OAuth2GrantServer::new(
        GrantServerConfig::default(),
        GrantStores::from_backend(&counting),
        Arc::new(RecordingEventSink::default()),
    )
    .unwrap();

    let missing_grant = TokenRequest {
        grant_type: None,
        ..password_request(None)
    };
    let missing_client = TokenRequest {
        client_id: None,
        ..password_request(None)
    };
    let missing_secret = TokenRequest {
        client_secret: None,
        ..password_request(None)
    };

    for (request, field) in [
        (missing_grant, "grant_type"),
        (missing_client, "client_id"),
        (missing_secret, "client_secret"),
    ] {
        let error = server.complete_grant(&request).await.unwrap_err();
        assert_eq!(error, GrantError::invalid_request(field));
    }
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn test_missing_user_identifiers_and_password() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());

    let no_identifier = TokenRequest {
        username: None,
        email: None,
        ..password_request(None)
    };
    let error = server.complete_grant(&no_identifier).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_request("username, email"));

    let no_password = TokenRequest {
        password: None,
        ..password_request(None)
    };
    let error = server.complete_grant(&no_password).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_request("password"));
}

#[tokio::test]
async fn test_unknown_grant_type_is_unsupported() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let request = TokenRequest {
        grant_type: Some("client_credentials".to_owned()),
        ..password_request(None)
    };

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::unsupported_grant_type("client_credentials"));
}

#[tokio::test]
async fn test_disallowed_scopes_are_dropped_by_default() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    store
        .insert_agent(common::test_agent_with(Some("limited"), None, ["user"]))
        .unwrap();
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, "limited", PASSWORD)
        .with_scope("user,admin");

    let response = server.complete_grant(&request).await.unwrap();
    assert_eq!(response.scopes, vec!["user"]);
}

#[tokio::test]
async fn test_disallowed_scope_raises_when_configured() {
    let config = GrantServerConfig {
        exception_on_invalid_scope: true,
        ..GrantServerConfig::default()
    };
    let (server, store, _) = create_memory_server(config);
    store
        .insert_agent(common::test_agent_with(Some("limited"), None, ["user"]))
        .unwrap();
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, "limited", PASSWORD)
        .with_scope("user,admin");

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_scope("admin"));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn test_user_without_scopes_cannot_request_any() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    store
        .insert_agent(common::test_agent_with(Some("scopeless"), None, []))
        .unwrap();
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, "scopeless", PASSWORD)
        .with_scope("user");

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_scope("user"));
}

#[tokio::test]
async fn test_trailing_delimiter_is_ignored() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());

    let response = server
        .complete_grant(&password_request(Some("user,")))
        .await
        .unwrap();
    assert_eq!(response.scopes, vec!["user"]);

    let access_token = store
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access_token.scopes.ids(), ["user"]);
}

#[tokio::test]
async fn test_default_scope_may_list_several_scopes() {
    let config = GrantServerConfig {
        default_scope: Some(vec!["user".to_owned(), "admin".to_owned()]),
        ..GrantServerConfig::default()
    };
    let (server, _, _) = create_memory_server(config);

    let response = server.complete_grant(&password_request(None)).await.unwrap();
    assert_eq!(response.scopes, vec!["user", "admin"]);
}

#[tokio::test]
async fn test_server_rejects_an_invalid_config() {
    let (store, _) = create_memory_store(StoreRestrictions::default());
    let configs = [
        GrantServerConfig {
            scope_delimiter: String::new(),
            ..GrantServerConfig::default()
        },
        GrantServerConfig {
            refresh_token_ttl_secs: 0,
            ..GrantServerConfig::default()
        },
        GrantServerConfig {
            default_scope: Some(Vec::new()),
            ..GrantServerConfig::default()
        },
    ];

    for config in configs {
        let result = OAuth2GrantServer::new(
            config,
            GrantStores::from_backend(&store),
            Arc::new(RecordingEventSink::default()),
        );
        assert!(result.is_err());
    }
}

#[tokio::test]
async fn test_default_scope_applies_to_empty_request() {
    let config = GrantServerConfig {
        default_scope: Some(vec!["user".to_owned()]),
        ..GrantServerConfig::default()
    };
    let (server, _, _) = create_memory_server(config);

    let response = server.complete_grant(&password_request(None)).await.unwrap();
    assert_eq!(response.scopes, vec!["user"]);

    let response = server
        .complete_grant(&password_request(Some(" , ")))
        .await
        .unwrap();
    assert_eq!(response.scopes, vec!["user"]);
}

#[tokio::test]
async fn test_scope_param_required_without_default() {
    let config = GrantServerConfig {
        scope_param_required: true,
        ..GrantServerConfig::default()
    };
    let (server, _, _) = create_memory_server(config);

    let error = server.complete_grant(&password_request(None)).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_request("scope"));
}

#[tokio::test]
async fn test_empty_scope_request_yields_scopeless_token() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());

    let response = server.complete_grant(&password_request(None)).await.unwrap();
    assert!(response.scopes.is_empty());
}

#[tokio::test]
async fn test_unknown_scope_is_invalid_scope() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    store
        .insert_agent(common::test_agent_with(Some("reader"), None, ["user", "read"]))
        .unwrap();
    let request = TokenRequest::password(CLIENT_ID, CLIENT_SECRET, "reader", PASSWORD)
        .with_scope("user,read");

    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_scope("read"));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn test_client_limited_to_grants() {
    let config = GrantServerConfig {
        limit_clients_to_grants: true,
        ..GrantServerConfig::default()
    };
    let (server, store, _) = create_memory_server(config);
    store
        .insert_client(common::test_client_with(
            "refresh-only",
            ["user"],
            vec![GrantType::RefreshToken],
        ))
        .unwrap();

    let request = TokenRequest::password("refresh-only", CLIENT_SECRET, USERNAME, PASSWORD);
    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidClient);

    assert!(server
        .complete_grant(&password_request(Some("user")))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_client_limited_to_scopes() {
    let config = GrantServerConfig {
        limit_clients_to_scopes: true,
        ..GrantServerConfig::default()
    };
    let (server, store, _) = create_memory_server(config);
    store
        .insert_client(common::test_client_with(
            "user-only",
            ["user"],
            vec![GrantType::Password],
        ))
        .unwrap();

    let request = TokenRequest::password("user-only", CLIENT_SECRET, USERNAME, PASSWORD)
        .with_scope("user,admin");
    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_scope("admin"));
}

#[tokio::test]
async fn test_refresh_token_not_issued_when_refresh_grant_disabled() {
    let config = GrantServerConfig {
        refresh_grant_enabled: false,
        ..GrantServerConfig::default()
    };
    let (server, store, _) = create_memory_server(config);

    let response = server
        .complete_grant(&password_request(Some("user")))
        .await
        .unwrap();
    assert!(response.refresh_token.is_none());
    assert_eq!(store.refresh_token_count().await, 0);
}

#[tokio::test]
async fn test_each_grant_opens_a_new_session() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());

    let first = server
        .complete_grant(&password_request(Some("user")))
        .await
        .unwrap();
    let second = server
        .complete_grant(&password_request(Some("user")))
        .await
        .unwrap();

    assert_ne!(first.access_token, second.access_token);
    assert_eq!(store.session_count().await, 2);

    let agent_id = server
        .resource_guard()
        .authenticate(Some(&first.access_token))
        .await
        .unwrap()
        .user_id()
        .unwrap();
    let sessions = store
        .sessions_for_owner(&SessionOwner::user(agent_id))
        .await
        .unwrap();
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
async fn test_grant_records_are_stamped_with_the_request_clock() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    let now = Utc::now() - Duration::minutes(30);

    let response = server
        .complete_grant_at(&password_request(Some("user")), now)
        .await
        .unwrap();

    let access = store
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access.created_at, now);
    assert_eq!(access.expire_time, now + Duration::seconds(7600));
    let session = store.get_session(access.session_id).await.unwrap().unwrap();
    assert_eq!(session.created_at, now);
}
