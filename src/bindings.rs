//! Key-canonicalizing value maps.
//!
//! Configuration, page attributes, data bags and template locals are all
//! addressed by name from two directions: Rust callers and templates. Top-level
//! keys are normalized at insertion so `":foo"` and `"foo"` address the same
//! entry. Values, including nested objects, are stored as given.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical form of a binding key.
///
/// A single leading `:` (symbol-style key) is stripped.
pub fn canonical_key(key: &str) -> &str {
    key.strip_prefix(':').unwrap_or(key)
}

/// String-keyed map of values with canonical keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct Bindings {
    entries: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bindings from a JSON object. Non-object values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl AsRef<str>, value: Value) -> Option<Value> {
        self.entries
            .insert(canonical_key(key.as_ref()).to_owned(), value)
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.entries.get(canonical_key(key.as_ref()))
    }

    pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.entries.contains_key(canonical_key(key.as_ref()))
    }

    /// Merge `other` over `self`, top-level keys only.
    ///
    /// A key present in both is replaced wholesale, never deep-merged.
    pub fn merge(&mut self, other: Bindings) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
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

    /// Snapshot as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Bindings {
    fn from(map: BTreeMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Bindings> for BTreeMap<String, Value> {
    fn from(bindings: Bindings) -> Self {
        bindings.entries
    }
}

impl<K: AsRef<str>> FromIterator<(K, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (k, v) in iter {
            bindings.insert(k, v);
        }
        bindings
    }
}

impl IntoIterator for Bindings {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
