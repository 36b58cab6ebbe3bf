// ABOUTME: Core types and constants for the Scopegate OAuth 2.0 grant engine
// ABOUTME: Foundation crate with error handling, persistence models, scope sets, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Scopegate Core
//!
//! Foundation crate providing shared types and constants for the Scopegate
//! grant engine. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Grant error taxonomy (`GrantError`) and storage errors (`DatabaseError`)
//! - **constants**: Grant type identifiers, token defaults, and owner types
//! - **models**: Persistence models for clients, agents, scopes, sessions, and tokens
//! - **scopes**: The `ScopeSet` value type and scope requirement checks

/// Grant error taxonomy and storage errors
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Persistence models (Client, Agent, Scope, Session, tokens)
pub mod models;

/// Ordered, deduplicated scope collections and scope checks
pub mod scopes;

pub use errors::{DatabaseError, GrantError, GrantResult};
pub use scopes::ScopeSet;
