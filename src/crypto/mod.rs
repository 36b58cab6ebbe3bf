// ABOUTME: Cryptographic helpers for credentials and opaque token identifiers
// ABOUTME: bcrypt for user passwords, Argon2 for client secrets, ring RNG for token ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Password and client secret hashing
pub mod passwords;
/// Secure random token identifiers
pub mod tokens;

pub use passwords::{
    hash_client_secret, hash_password, hash_password_blocking, hash_password_with_cost,
    verify_client_secret, verify_password, verify_password_blocking,
};
pub use tokens::{constant_time_eq, generate_random_string, generate_token_id, sha256_hex};
