// ABOUTME: Scope negotiation: parse the requested string, restrict it, apply defaults, look each id up
// ABOUTME: Also checks refresh-grant scope requests against the original session scopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use scopegate_core::constants::oauth::DEFAULT_SCOPE_DELIMITER;
use scopegate_core::errors::{GrantError, GrantResult};
use scopegate_core::models::GrantType;
use scopegate_core::scopes::ScopeSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database_plugins::ScopeStore;

/// Scope negotiation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePolicy {
    /// Separator between scope ids in the `scope` parameter
    pub delimiter: String,
    /// Scopes granted when the request asks for none
    pub default_scope: Option<Vec<String>>,
    /// Reject requests without scopes when no default is configured
    pub scope_param_required: bool,
    /// Reject requested scopes the resource owner does not hold instead of dropping them
    pub exception_on_invalid_scope: bool,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_SCOPE_DELIMITER.to_owned(),
            default_scope: None,
            scope_param_required: false,
            exception_on_invalid_scope: false,
        }
    }
}

/// Validates requested scopes against policy, allowed sets, and the scope catalog
#[derive(Clone)]
pub struct ScopeValidator {
    scopes: Arc<dyn ScopeStore>,
    policy: ScopePolicy,
}

impl ScopeValidator {
    /// Create a validator over the `scopes` catalog
    #[must_use]
    pub fn new(scopes: Arc<dyn ScopeStore>, policy: ScopePolicy) -> Self {
        Self { scopes, policy }
    }

    /// Policy in effect
    #[must_use]
    pub const fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Split a raw scope parameter; a missing parameter is an empty request
    #[must_use]
    pub fn parse(&self, requested: Option<&str>) -> ScopeSet {
        requested.map_or_else(ScopeSet::new, |raw| {
            ScopeSet::parse(raw, &self.policy.delimiter)
        })
    }

    /// Restrict `requested` to the scopes in `allowed`
    ///
    /// Disallowed scopes are dropped unless the policy raises on them or
    /// `allowed` is empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` naming the first disallowed scope when raising
    pub fn restrict(&self, requested: &ScopeSet, allowed: &ScopeSet) -> GrantResult<ScopeSet> {
        if self.policy.exception_on_invalid_scope || allowed.is_empty() {
            if let Some(scope) = requested.first_outside(allowed) {
                return Err(GrantError::invalid_scope(scope));
            }
        }
        Ok(requested.intersection(allowed))
    }

    /// Substitute the default scope for an empty request
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest("scope")` when the request is empty, the scope
    /// parameter is required, and no default is configured
    pub fn apply_default(&self, requested: ScopeSet) -> GrantResult<ScopeSet> {
        if !requested.is_empty() {
            return Ok(requested);
        }
        match &self.policy.default_scope {
            Some(default_scope) => Ok(ScopeSet::from_ids(default_scope.iter().cloned())),
            None if self.policy.scope_param_required => Err(GrantError::invalid_request("scope")),
            None => Ok(requested),
        }
    }

    /// Resolve every id through the scope catalog
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` for the first id the store does not resolve
    pub async fn lookup_all(
        &self,
        scopes: &ScopeSet,
        grant_type: GrantType,
        client_id: &str,
    ) -> GrantResult<ScopeSet> {
        let mut resolved = ScopeSet::new();
        for scope_id in scopes {
            let scope = self
                .scopes
                .get_scope(scope_id, grant_type, Some(client_id))
                .await?
                .ok_or_else(|| {
                    debug!(scope = %scope_id, client_id = %client_id, "Scope lookup failed");
                    GrantError::invalid_scope(scope_id.as_str())
                })?;
            resolved.insert(scope.id);
        }
        Ok(resolved)
    }

    /// Full scope validation for a new grant
    ///
    /// `allowed` is the resource owner's scope set for the password grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope`, `InvalidRequest("scope")`, or `Storage`
    pub async fn validate(
        &self,
        requested: Option<&str>,
        allowed: Option<&ScopeSet>,
        grant_type: GrantType,
        client_id: &str,
    ) -> GrantResult<ScopeSet> {
        let mut scopes = self.parse(requested);
        if let Some(allowed) = allowed {
            scopes = self.restrict(&scopes, allowed)?;
        }
        let scopes = self.apply_default(scopes)?;
        self.lookup_all(&scopes, grant_type, client_id).await
    }

    /// Scope validation for a refresh grant
    ///
    /// An empty request keeps `original` unchanged; otherwise every requested
    /// scope must be part of `original` and resolve in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` naming the first scope outside `original` or not in the catalog
    pub async fn validate_subset(
        &self,
        requested: Option<&str>,
        original: &ScopeSet,
        grant_type: GrantType,
        client_id: &str,
    ) -> GrantResult<ScopeSet> {
        let requested = self.parse(requested);
        if requested.is_empty() {
            return Ok(original.clone());
        }
        if let Some(scope) = requested.first_outside(original) {
            return Err(GrantError::invalid_scope(scope));
        }
        self.lookup_all(&requested, grant_type, client_id).await
    }
}
