// ABOUTME: Secure random token id generation and digest helpers
// ABOUTME: Token ids are 256-bit ring SystemRandom values in URL-safe base64 without padding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use scopegate_core::constants::oauth::TOKEN_ID_BYTES;
use scopegate_core::errors::{GrantError, GrantResult};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate `length` random bytes encoded as URL-safe base64
///
/// # Errors
///
/// Returns an error if the system RNG fails; the engine cannot issue tokens without it
pub fn generate_random_string(length: usize) -> GrantResult<String> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; length];

    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(
            "CRITICAL: SystemRandom failed - cannot generate secure random bytes: {}",
            e
        );
        GrantError::internal("System RNG failure - cannot generate secure token ids")
    })?;

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&bytes))
}

/// Generate an access or refresh token id (256 bits)
///
/// # Errors
///
/// Returns an error if the system RNG fails
pub fn generate_token_id() -> GrantResult<String> {
    generate_random_string(TOKEN_ID_BYTES)
}

/// Lowercase hex SHA-256 digest
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare two strings in constant time
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
