//! Authorization-role collaborator interface.
//!
//! The role store is external to the session layer; sessions only need to
//! clear a token's roles on close. `MapRoleStore` is the in-memory default
//! for hosts that have nothing fancier.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Token-keyed role assignments.
pub trait RoleStore: Send + Sync {
    fn assign(&self, token: &str, role: &str);
    fn has(&self, token: &str, role: &str) -> bool;
    fn revoke(&self, token: &str, role: &str);
    /// Remove every role held by `token`. Called when a session closes.
    fn revoke_all(&self, token: &str);
    fn list(&self, token: &str) -> Vec<String>;
}

/// In-memory role store.
#[derive(Debug, Default)]
pub struct MapRoleStore {
    roles: Mutex<HashMap<String, HashSet<String>>>,
}

impl MapRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleStore for MapRoleStore {
    fn assign(&self, token: &str, role: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .insert(role.to_string());
    }

    fn has(&self, token: &str, role: &str) -> bool {
        self.roles
            .lock()
            .unwrap()
            .get(token)
            .is_some_and(|set| set.contains(role))
    }

    fn revoke(&self, token: &str, role: &str) {
        let mut roles = self.roles.lock().unwrap();
        if let Some(set) = roles.get_mut(token) {
            set.remove(role);
            if set.is_empty() {
                roles.remove(token);
            }
        }
    }

    fn revoke_all(&self, token: &str) {
        self.roles.lock().unwrap().remove(token);
    }

    fn list(&self, token: &str) -> Vec<String> {
        self.roles
            .lock()
            .unwrap()
            .get(token)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
