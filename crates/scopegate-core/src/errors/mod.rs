// ABOUTME: Error handling for the grant engine and its storage backends
// ABOUTME: Re-exports GrantError (client-facing taxonomy) and DatabaseError (storage failures)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Error types
//!
//! `GrantError` is the taxonomy returned by every grant operation. Storage
//! failures travel inside it as `GrantError::Storage` so that callers can tell
//! a rejected request apart from a broken backend.

/// Storage backend errors
pub mod database;

/// Grant flow error taxonomy
pub mod grant;

pub use database::DatabaseError;
pub use grant::GrantError;

/// Result alias used across the grant engine
pub type GrantResult<T> = Result<T, GrantError>;
