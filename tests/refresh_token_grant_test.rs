// ABOUTME: Integration tests for the refresh token grant
// ABOUTME: Covers rotation, scope narrowing, expiry, client binding, and concurrent use of one token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{Duration, Utc};
use common::{
    create_memory_server, password_request, refresh_request, CLIENT_SECRET, PASSWORD, USERNAME,
};
use scopegate::config::GrantServerConfig;
use scopegate::database_plugins::RefreshTokenStore;
use scopegate::errors::GrantError;
use scopegate::models::GrantType;
use scopegate::oauth2_server::{OAuth2GrantServer, TokenRequest, TokenResponse};

async fn initial_tokens(server: &OAuth2GrantServer, scope: &str) -> TokenResponse {
    server
        .complete_grant(&password_request(Some(scope)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user,admin").await;
    let old_refresh = initial.refresh_token.clone().unwrap();

    let refreshed = server
        .complete_grant(&refresh_request(&old_refresh, None))
        .await
        .unwrap();

    let new_refresh = refreshed.refresh_token.clone().unwrap();
    assert_ne!(new_refresh, old_refresh);
    assert_ne!(refreshed.access_token, initial.access_token);
    assert_eq!(refreshed.scopes, vec!["user", "admin"]);
    assert_eq!(refreshed.expires_in, 7600);
    assert_eq!(store.session_count().await, 1);

    let error = server
        .complete_grant(&refresh_request(&old_refresh, None))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);
    assert_eq!(error.error_code(), "invalid_request");

    let guard = server.resource_guard();
    assert_eq!(
        guard.authenticate(Some(&initial.access_token)).await.unwrap_err(),
        GrantError::AccessDenied
    );
    assert!(guard.authenticate(Some(&refreshed.access_token)).await.is_ok());

    assert!(server
        .complete_grant(&refresh_request(&new_refresh, None))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let config = GrantServerConfig {
        rotate_refresh_tokens: false,
        ..GrantServerConfig::default()
    };
    let (server, store, _) = create_memory_server(config);
    let initial = initial_tokens(&server, "user").await;
    let refresh_token = initial.refresh_token.clone().unwrap();

    let first = server
        .complete_grant(&refresh_request(&refresh_token, None))
        .await
        .unwrap();
    let second = server
        .complete_grant(&refresh_request(&refresh_token, None))
        .await
        .unwrap();

    assert_eq!(first.refresh_token.as_deref(), Some(refresh_token.as_str()));
    assert_eq!(second.refresh_token.as_deref(), Some(refresh_token.as_str()));
    assert_ne!(first.access_token, second.access_token);
    assert_eq!(store.refresh_token_count().await, 1);
    assert_eq!(store.access_token_count().await, 3);

    let guard = server.resource_guard();
    assert!(guard.authenticate(Some(&initial.access_token)).await.is_err());
    assert!(guard.authenticate(Some(&second.access_token)).await.is_ok());
}

#[tokio::test]
async fn test_refresh_can_narrow_scopes() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user,admin").await;

    let narrowed = server
        .complete_grant(&refresh_request(
            initial.refresh_token.as_deref().unwrap(),
            Some("user"),
        ))
        .await
        .unwrap();
    assert_eq!(narrowed.scopes, vec!["user"]);

    // The session keeps its original scopes, so a later refresh may widen again
    let widened = server
        .complete_grant(&refresh_request(
            narrowed.refresh_token.as_deref().unwrap(),
            Some("user,admin"),
        ))
        .await
        .unwrap();
    assert_eq!(widened.scopes, vec!["user", "admin"]);
}

#[tokio::test]
async fn test_refresh_rejects_scopes_outside_the_session() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let refresh_token = initial.refresh_token.unwrap();

    let error = server
        .complete_grant(&refresh_request(&refresh_token, Some("user,admin")))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::invalid_scope("admin"));

    // A rejected refresh writes and consumes nothing
    assert_eq!(store.access_token_count().await, 1);
    assert_eq!(store.refresh_token_count().await, 1);
    assert!(store
        .get_refresh_token(&refresh_token)
        .await
        .unwrap()
        .is_some_and(|token| token.is_active_at(Utc::now())));
    assert!(server
        .complete_grant(&refresh_request(&refresh_token, None))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_refresh_with_empty_scope_ignores_default_scope() {
    let config = GrantServerConfig {
        default_scope: Some(vec!["user".to_owned()]),
        ..GrantServerConfig::default()
    };
    let (server, _, _) = create_memory_server(config);
    let initial = initial_tokens(&server, "user,admin").await;

    let refreshed = server
        .complete_grant(&refresh_request(
            initial.refresh_token.as_deref().unwrap(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(refreshed.scopes, vec!["user", "admin"]);
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let refresh_token = initial.refresh_token.unwrap();

    let later = Utc::now() + Duration::seconds(14_601);
    let error = server
        .complete_grant_at(&refresh_request(&refresh_token, None), later)
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);

    let just_before = Utc::now() + Duration::seconds(14_000);
    assert!(server
        .complete_grant_at(&refresh_request(&refresh_token, None), just_before)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unknown_and_missing_refresh_token() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());

    let error = server
        .complete_grant(&refresh_request("not-a-real-token", None))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);

    let request = TokenRequest {
        refresh_token: None,
        ..refresh_request("ignored", None)
    };
    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::invalid_request("refresh_token"));
}

#[tokio::test]
async fn test_refresh_token_is_bound_to_its_client() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    store
        .insert_client(common::test_client_with(
            "client2",
            ["user"],
            vec![GrantType::Password, GrantType::RefreshToken],
        ))
        .unwrap();
    let initial = initial_tokens(&server, "user").await;

    let request = TokenRequest::refresh(
        "client2",
        CLIENT_SECRET,
        initial.refresh_token.as_deref().unwrap(),
    );
    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);
}

#[tokio::test]
async fn test_refresh_requires_client_authentication() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;

    let request = TokenRequest::refresh(
        common::CLIENT_ID,
        "wrong-secret",
        initial.refresh_token.as_deref().unwrap(),
    );
    let error = server.complete_grant(&request).await.unwrap_err();
    assert_eq!(error, GrantError::InvalidClient);
}

#[tokio::test]
async fn test_refresh_grant_disabled_is_unsupported() {
    let config = GrantServerConfig {
        refresh_grant_enabled: false,
        ..GrantServerConfig::default()
    };
    let (server, _, _) = create_memory_server(config);

    let error = server
        .complete_grant(&refresh_request("anything", None))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::unsupported_grant_type("refresh_token"));
}

#[tokio::test]
async fn test_concurrent_refresh_succeeds_once() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let request = refresh_request(initial.refresh_token.as_deref().unwrap(), None);

    let (first, second) = tokio::join!(
        server.complete_grant(&request),
        server.complete_grant(&request)
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(outcomes
        .iter()
        .any(|outcome| outcome.as_ref().err() == Some(&GrantError::InvalidRefresh)));
    assert_eq!(store.access_token_count().await, 2);
    assert_eq!(store.refresh_token_count().await, 2);
}

#[tokio::test]
async fn test_revoked_sessions_cannot_refresh() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let guard = server.resource_guard();
    let agent = guard.authenticate(Some(&initial.access_token)).await.unwrap();

    let revoked = guard.revoke_sessions_for_owner(&agent.owner).await.unwrap();
    assert_eq!(revoked, 1);

    let error = server
        .complete_grant(&refresh_request(
            initial.refresh_token.as_deref().unwrap(),
            None,
        ))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);

    // Fresh credentials still work
    let request = TokenRequest::password(common::CLIENT_ID, CLIENT_SECRET, USERNAME, PASSWORD);
    assert!(server.complete_grant(&request).await.is_ok());
}

#[tokio::test]
async fn test_consumed_refresh_token_stays_consumed_for_an_earlier_clock() {
    let (server, store, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let request = refresh_request(initial.refresh_token.as_deref().unwrap(), None);
    let started = Utc::now();

    let later = server
        .complete_grant_at(&request, started + Duration::seconds(2))
        .await
        .unwrap();
    let error = server
        .complete_grant_at(&request, started + Duration::seconds(1))
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);
    assert_eq!(store.access_token_count().await, 2);

    let consumed = store
        .get_refresh_token(initial.refresh_token.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(consumed.revoked_at, Some(started + Duration::seconds(2)));
    assert!(!consumed.is_active_at(started));

    assert!(server
        .complete_grant_at(
            &refresh_request(later.refresh_token.as_deref().unwrap(), None),
            started + Duration::seconds(1),
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn test_revoked_refresh_token_is_rejected_for_an_earlier_clock() {
    let (server, _, _) = create_memory_server(GrantServerConfig::default());
    let initial = initial_tokens(&server, "user").await;
    let guard = server.resource_guard();
    let agent = guard.authenticate(Some(&initial.access_token)).await.unwrap();
    guard.revoke_sessions_for_owner(&agent.owner).await.unwrap();

    let error = server
        .complete_grant_at(
            &refresh_request(initial.refresh_token.as_deref().unwrap(), None),
            Utc::now() - Duration::seconds(30),
        )
        .await
        .unwrap_err();
    assert_eq!(error, GrantError::InvalidRefresh);
}
