// ABOUTME: ScopeSet value type: insertion-ordered, deduplicated scope ids with set operations
// ABOUTME: Also hosts the one-of-many scope requirement check used by resource guards
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::slice::Iter;
use std::vec::IntoIter;

use serde::{Deserialize, Serialize};

/// Deduplicated scope ids, kept in the order they were first inserted
///
/// Ordering matters for responses: scopes come back in the order the client
/// requested them, so the set is backed by a `Vec` rather than a hash set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet {
    ids: Vec<String>,
}

impl ScopeSet {
    /// Create an empty set
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Parse a delimited scope string
    ///
    /// Tokens are trimmed and empty tokens are dropped, so `"user,"` and
    /// `" user , ,"` both parse to `[user]`.
    #[must_use]
    pub fn parse(raw: &str, delimiter: &str) -> Self {
        raw.split(delimiter)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Build a set from ids, dropping duplicates
    #[must_use]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// Insert an id, returning false when it was already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Whether the set holds `id`
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    /// Whether every id in this set is also in `other`
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.ids.iter().all(|id| other.contains(id))
    }

    /// Ids present in both sets, in this set's order
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            ids: self
                .ids
                .iter()
                .filter(|id| other.contains(id))
                .cloned()
                .collect(),
        }
    }

    /// First id of this set that `other` lacks
    #[must_use]
    pub fn first_outside(&self, other: &Self) -> Option<&str> {
        self.ids
            .iter()
            .find(|id| !other.contains(id))
            .map(String::as_str)
    }

    /// Scope ids in insertion order
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Iterate over ids
    pub fn iter(&self) -> Iter<'_, String> {
        self.ids.iter()
    }

    /// Number of ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether every scope in `required` is held
    #[must_use]
    pub fn has_all(&self, required: &[&str]) -> bool {
        required.iter().all(|id| self.contains(id))
    }

    /// Whether at least one of the requirement sets is fully held
    ///
    /// Each inner slice is an all-of requirement; the outer slice is an
    /// any-of. `[["admin"], ["user", "billing"]]` passes for an admin, or
    /// for someone holding both `user` and `billing`. An empty outer slice
    /// never passes.
    #[must_use]
    pub fn has_one_of(&self, requirement_sets: &[&[&str]]) -> bool {
        requirement_sets.iter().any(|set| self.has_all(set))
    }

    /// Join ids with `delimiter`
    #[must_use]
    pub fn join(&self, delimiter: &str) -> String {
        self.ids.join(delimiter)
    }

    /// Consume the set into its ids
    #[must_use]
    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(ids: Vec<String>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(set: ScopeSet) -> Self {
        set.ids
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

impl IntoIterator for ScopeSet {
    type Item = String;
    type IntoIter = IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl Display for ScopeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.ids.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_junk_tokens() {
        assert_eq!(ScopeSet::parse("user,", ",").ids(), ["user"]);
        assert_eq!(ScopeSet::parse(" user , ,admin ", ",").ids(), ["user", "admin"]);
        assert!(ScopeSet::parse("", ",").is_empty());
        assert!(ScopeSet::parse(",,,", ",").is_empty());
    }

    #[test]
    fn test_parse_deduplicates_preserving_order() {
        let set = ScopeSet::parse("admin,user,admin", ",");
        assert_eq!(set.ids(), ["admin", "user"]);
    }

    #[test]
    fn test_parse_with_custom_delimiter() {
        let set = ScopeSet::parse("read write", " ");
        assert_eq!(set.ids(), ["read", "write"]);
    }

    #[test]
    fn test_intersection_keeps_left_order() {
        let requested = ScopeSet::from_ids(["admin", "junk", "user"]);
        let allowed = ScopeSet::from_ids(["user", "admin"]);
        assert_eq!(requested.intersection(&allowed).ids(), ["admin", "user"]);
        assert_eq!(requested.first_outside(&allowed), Some("junk"));
    }

    #[test]
    fn test_subset() {
        let original = ScopeSet::from_ids(["user", "admin"]);
        assert!(ScopeSet::from_ids(["user"]).is_subset_of(&original));
        assert!(ScopeSet::new().is_subset_of(&original));
        assert!(!ScopeSet::from_ids(["user", "billing"]).is_subset_of(&original));
    }

    #[test]
    fn test_has_one_of_sets() {
        let held = ScopeSet::from_ids(["user", "billing"]);
        assert!(held.has_one_of(&[&["admin"], &["user", "billing"]]));
        assert!(!held.has_one_of(&[&["admin"], &["user", "reports"]]));
        assert!(!held.has_one_of(&[]));
        assert!(held.has_all(&["billing"]));
    }

    #[test]
    fn test_serde_dedupes_on_deserialize() {
        let set: ScopeSet = serde_json::from_str(r#"["user","user","admin"]"#).unwrap();
        assert_eq!(set.ids(), ["user", "admin"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["user","admin"]"#);
    }
}
