// ABOUTME: Credential hashing: bcrypt for agent passwords and Argon2 for client secrets
// ABOUTME: Verification never errors outward; a malformed hash simply fails to verify
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use scopegate_core::errors::{GrantError, GrantResult};
use tokio::task;

/// Hash an agent password with bcrypt at the default cost
///
/// # Errors
///
/// Returns `GrantError::Internal` if bcrypt fails
pub fn hash_password(password: &str) -> GrantResult<String> {
    hash_password_with_cost(password, bcrypt::DEFAULT_COST)
}

/// Hash an agent password with bcrypt at an explicit cost
///
/// # Errors
///
/// Returns `GrantError::Internal` if the cost is out of range or bcrypt fails
pub fn hash_password_with_cost(password: &str, cost: u32) -> GrantResult<String> {
    bcrypt::hash(password, cost).map_err(|e| {
        tracing::error!("bcrypt password hashing failed: {}", e);
        GrantError::internal("Password hashing failed")
    })
}

/// Hash an agent password on the blocking pool
///
/// # Errors
///
/// Returns `GrantError::Internal` if bcrypt fails or the blocking task is lost
pub async fn hash_password_blocking(password: String, cost: u32) -> GrantResult<String> {
    task::spawn_blocking(move || hash_password_with_cost(&password, cost))
        .await
        .map_err(|e| {
            tracing::error!("bcrypt hashing task failed: {}", e);
            GrantError::internal("Password hashing failed")
        })?
}

/// Check an agent password against its bcrypt hash
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check an agent password on the blocking pool
///
/// bcrypt is deliberately slow, so async callers hand it to `spawn_blocking`.
pub async fn verify_password_blocking(password: String, hash: String) -> bool {
    task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

/// Hash a client secret with Argon2
///
/// # Errors
///
/// Returns `GrantError::Internal` if Argon2 hashing fails
pub fn hash_client_secret(secret: &str) -> GrantResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| GrantError::internal(format!("Argon2 password hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Check a client secret against its Argon2 PHC hash
#[must_use]
pub fn verify_client_secret(secret: &str, secret_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(secret_hash) else {
        tracing::error!("Failed to parse stored client secret hash");
        return false;
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_round_trip() {
        let hash = hash_client_secret("client1secret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_client_secret("client1secret", &hash));
        assert!(!verify_client_secret("wrong", &hash));
        assert!(!verify_client_secret("client1secret", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_blocking_hash_verifies() {
        let hash = hash_password_blocking("aUserPassword".to_owned(), 4)
            .await
            .unwrap();
        assert!(verify_password_blocking("aUserPassword".to_owned(), hash).await);
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password_with_cost("aUserPassword", 4).unwrap();
        assert!(verify_password("aUserPassword", &hash));
        assert!(!verify_password("aUserPasswordX", &hash));
        assert!(!verify_password("aUserPassword", "garbage"));
    }
}
