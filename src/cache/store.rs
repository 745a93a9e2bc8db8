//! Process-local cache storage.
//!
//! Lives as long as the processing unit that owns it. No TTL, no eviction:
//! entries disappear on explicit delete or when the store is dropped.

use std::collections::HashMap;

use bytes::Bytes;
use glob::Pattern;

#[derive(Debug, Default)]
pub struct LocalStore {
    entries: HashMap<String, Bytes>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: Bytes) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every key matching `pattern`, returning how many were dropped.
    pub fn remove_matching(&mut self, pattern: &Pattern) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.matches(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
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
}
