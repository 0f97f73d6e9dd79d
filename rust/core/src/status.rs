// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-primitive status accumulation
//!
//! Collects the distinct error messages seen for each primitive type.
//! A key that is present with no errors was seen and fully valid at least
//! once; a key that is absent was never seen.

use serde::Serialize;
use std::collections::BTreeMap;

/// Map from primitive type name to the distinct errors recorded for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `key` exists without recording an error
    pub fn append_valid(&mut self, key: &str) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), Vec::new());
        }
    }

    /// Ensure `key` exists and record `message` unless empty or already present
    pub fn append_error(&mut self, key: &str, message: &str) {
        let errors = self.entries.entry(key.to_string()).or_default();
        if !message.is_empty() && !errors.iter().any(|e| e == message) {
            errors.push(message.to_string());
        }
    }

    /// True when `key` has no recorded errors.
    ///
    /// Vacuously true for keys never seen; use [`StatusMap::contains`] to
    /// tell "never seen" apart from "seen without errors".
    pub fn valid_key(&self, key: &str) -> bool {
        self.entries.get(key).map_or(true, |errors| errors.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Errors recorded for `key` (empty if none or unseen)
    pub fn errors(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when no key has errors
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Keys that have at least one recorded error, in sorted order
    pub fn invalid_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(key, _)| key.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line describing every invalid key and its joined errors.
    ///
    /// Format: `key: err1, err2; other: err3`. Empty when everything is valid.
    pub fn invalid_key_summary(&self) -> String {
        self.entries
            .iter()
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(key, errors)| format!("{}: {}", key, errors.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Fold another status map into this one
    pub fn extend(&mut self, other: &StatusMap) {
        for (key, errors) in &other.entries {
            self.append_valid(key);
            for error in errors {
                self.append_error(key, error);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_vs_unseen() {
        let mut status = StatusMap::new();
        assert!(status.valid_key("arc"));
        assert!(!status.contains("arc"));

        status.append_valid("arc");
        assert!(status.valid_key("arc"));
        assert!(status.contains("arc"));
    }

    #[test]
    fn test_errors_are_deduplicated() {
        let mut status = StatusMap::new();
        status.append_error("sphere", "radius should be > 0");
        status.append_error("sphere", "radius should be > 0");
        status.append_error("sphere", "");
        assert_eq!(status.errors("sphere").len(), 1);
        assert!(!status.valid_key("sphere"));
    }

    #[test]
    fn test_empty_message_still_registers_key() {
        let mut status = StatusMap::new();
        status.append_error("cone", "");
        assert!(status.contains("cone"));
        assert!(status.valid_key("cone"));
    }

    #[test]
    fn test_append_valid_keeps_errors() {
        let mut status = StatusMap::new();
        status.append_error("curve", "bad knots");
        status.append_valid("curve");
        assert_eq!(status.errors("curve"), ["bad knots".to_string()]);
    }

    #[test]
    fn test_invalid_key_summary() {
        let mut status = StatusMap::new();
        status.append_valid("block");
        status.append_error("sphere", "a");
        status.append_error("sphere", "b");
        status.append_error("arc", "c");
        assert_eq!(status.invalid_key_summary(), "arc: c; sphere: a, b");
        assert_eq!(status.invalid_keys().collect::<Vec<_>>(), vec!["arc", "sphere"]);
        assert!(!status.is_valid());
    }
}
