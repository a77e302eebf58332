// src/config/set.rs

//! `ConfigSet`: the string-keyed settings bag handed to every operation.

use std::collections::BTreeMap;

use crate::errors::{ExecError, Result};

/// Ordered mapping from setting key to value.
///
/// Keys are case-sensitive. Dotted namespaces (`mysql.host`) are a
/// convention only. There are no null values: a key is either set or absent,
/// and later writes replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSet {
    entries: BTreeMap<String, String>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`ConfigSet::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Value for `key` only if it is present and not empty.
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// `true` only when the value is `"true"` ignoring case.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(parse_bool)
    }

    /// Like [`ConfigSet::is_truthy`] but with an explicit default for absent
    /// keys.
    pub fn is_truthy_or(&self, key: &str, default: bool) -> bool {
        self.get(key).map(parse_bool).unwrap_or(default)
    }

    /// Non-empty value for `key` or a `ConfigError` naming it.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get_nonempty(key)
            .ok_or_else(|| ExecError::ConfigError(format!("{key} is required")))
    }

    /// Check that every key is present and non-empty.
    pub fn require_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.require(key)?;
        }
        Ok(())
    }

    /// Overlay `overrides` on top of `self` (last write wins).
    pub fn merge(&mut self, overrides: &ConfigSet) {
        for (k, v) in overrides.iter() {
            self.set(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a `key=value` pair as given on the command line.
    pub fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
        match s.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => Err(format!("invalid setting '{s}' (expected KEY=VALUE)")),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ConfigSet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
