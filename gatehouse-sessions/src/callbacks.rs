//! Close-callback registry.
//!
//! Hosts register named callbacks that fire with a session's final JSON state
//! when the session closes or the sweep evicts it. Callbacks never run while
//! the store lock is held.

use std::collections::HashMap;
use std::sync::Mutex;

type CloseCallback = Box<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Named registry of functions invoked when a session closes.
#[derive(Default)]
pub struct CloseCallbacks {
    callbacks: Mutex<HashMap<String, CloseCallback>>,
}

impl CloseCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under `name`, replacing any previous one.
    pub fn register<F>(&self, name: &str, callback: F)
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .unwrap()
            .insert(name.to_string(), Box::new(callback));
    }

    pub fn deregister(&self, name: &str) {
        self.callbacks.lock().unwrap().remove(name);
    }

    /// Invoke every registered callback with the closing session's state.
    pub fn call_all(&self, state: &serde_json::Value) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.values() {
            callback(state);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().unwrap().is_empty()
    }
}

impl std::fmt::Debug for CloseCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseCallbacks")
            .field("registered", &self.len())
            .finish()
    }
}
