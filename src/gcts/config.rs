//! gcts::config
//!
//! Configuration merge engine.
//!
//! The service represents repository, user, and system configuration as
//! an ordered list of key/value/category entries. The client's view
//! collapses that list into an order-preserving mapping: first
//! occurrence fixes a key's position, later writes update it in place,
//! new keys append at the end.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One server-side configuration entry.
///
/// `value` and `category` are optional on the wire; both are omitted
/// from serialized requests when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            category: None,
        }
    }
}

/// Collapse an ordered entry list into a key → value mapping.
///
/// A missing `value` resolves to the empty string. Duplicate keys keep
/// their first position and take the last value seen.
pub fn to_mapping(entries: &[ConfigEntry]) -> IndexMap<String, String> {
    let mut mapping = IndexMap::with_capacity(entries.len());
    for entry in entries {
        mapping.insert(
            entry.key.clone(),
            entry.value.clone().unwrap_or_default(),
        );
    }
    mapping
}

/// Replace the value of `key` in place, or append a new entry.
pub fn upsert(entries: &mut Vec<ConfigEntry>, key: &str, value: &str) {
    match entries.iter_mut().find(|entry| entry.key == key) {
        Some(entry) => entry.value = Some(value.to_string()),
        None => entries.push(ConfigEntry::new(key, value)),
    }
}

/// Drop the entry with the given key; absent keys are a no-op.
pub fn remove(entries: &mut Vec<ConfigEntry>, key: &str) {
    entries.retain(|entry| entry.key != key);
}
