// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Grant identifiers, token defaults, and session owner types for Scopegate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// OAuth 2.0 grant and token constants
pub mod oauth;

pub use oauth::*;
