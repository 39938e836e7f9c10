//! Per-session key/value storage.
//!
//! Lives exactly as long as the app session (one browser tab, one desktop
//! window) and is never written to disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct SessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    /// Store `value` only if `key` is unset. Returns whether it was stored.
    pub fn set_if_absent(&self, key: &str, value: &str) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value.to_string());
        true
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Drop everything, as when the session ends.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
