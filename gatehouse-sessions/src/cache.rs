//! Per-session key/value cache for the storage session variant.

use crate::record::SessionPayload;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key/value cache scoped to one session instance.
///
/// Cloning a `SessionCache` clones the reference, not the contents, so the
/// cache travels with every snapshot while writes stay visible to every
/// holder. Contents are destroyed when the owning session closes.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value stored under `key`.
    pub fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Write `value` under `key`, replacing any previous value.
    pub fn write(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Remove the value stored under `key`.
    pub fn destroy(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl SessionPayload for SessionCache {
    fn to_json(&self) -> serde_json::Value {
        let entries = self.entries.lock().unwrap();
        json!(entries.clone())
    }

    fn on_destroy(&self) {
        self.clear();
    }
}
