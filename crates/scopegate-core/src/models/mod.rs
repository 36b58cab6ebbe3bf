// ABOUTME: Core data models shared by the grant engine and storage backends
// ABOUTME: Re-exports clients, agents, scopes, sessions, and token records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// OAuth 2.0 grant persistence models
pub mod oauth2_server;

pub use oauth2_server::{
    AccessToken, Agent, Client, GrantType, OwnerType, RefreshToken, Scope, Session, SessionOwner,
};
