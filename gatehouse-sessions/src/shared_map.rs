//! Default concurrent session store.
//!
//! One token→snapshot map shared by every caller, guarded by a single mutex,
//! plus a background sweep that evicts garbage sessions. Lock hold times are
//! one map operation; close callbacks run with the lock released.

use crate::callbacks::CloseCallbacks;
use crate::handler::{SessionHandler, TokenGenerator};
use crate::properties::{defaults, keys};
use crate::record::{SessionPayload, SessionRecord};
use crate::roles::RoleStore;
use gatehouse_core::{parse_or_default, PropertyProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Lock-guarded in-process session store with a periodic eviction sweep.
///
/// Constructing a handler with sweeping enabled spawns one tokio task, so it
/// must happen inside a runtime; set `session_clean_frequency` to a negative
/// value to disable the sweep. The task stops when the handler is dropped.
pub struct SharedMapSessionHandler<P: SessionPayload> {
    store: Arc<SessionStore<P>>,
    generator: TokenGenerator,
    sweeper_shutdown: Option<oneshot::Sender<()>>,
}

/// The shared state the sweep task holds weakly, so a dropped handler takes
/// its store down with it.
struct SessionStore<P: SessionPayload> {
    sessions: Mutex<HashMap<String, SessionRecord<P>>>,
    properties: Arc<dyn PropertyProvider>,
    roles: Arc<dyn RoleStore>,
    callbacks: Arc<CloseCallbacks>,
}

impl<P: SessionPayload> SharedMapSessionHandler<P> {
    pub fn new(
        properties: Arc<dyn PropertyProvider>,
        roles: Arc<dyn RoleStore>,
        callbacks: Arc<CloseCallbacks>,
    ) -> Self {
        let clean_frequency = parse_or_default(
            properties.get_property(keys::SESSION_CLEAN_FREQUENCY),
            keys::SESSION_CLEAN_FREQUENCY,
            defaults::CLEAN_FREQUENCY,
        );
        let token_length = parse_or_default(
            properties.get_property(keys::SESSION_TOKEN_LENGTH),
            keys::SESSION_TOKEN_LENGTH,
            defaults::TOKEN_LENGTH,
        );

        let store = Arc::new(SessionStore {
            sessions: Mutex::new(HashMap::new()),
            properties,
            roles,
            callbacks,
        });

        let sweeper_shutdown = if clean_frequency >= 0 {
            Some(Self::spawn_sweeper(
                Arc::downgrade(&store),
                clean_frequency.max(1) as u64,
            ))
        } else {
            debug!("session sweep disabled by configuration");
            None
        };

        Self {
            store,
            generator: TokenGenerator::new(token_length),
            sweeper_shutdown,
        }
    }

    fn spawn_sweeper(store: Weak<SessionStore<P>>, frequency_secs: u64) -> oneshot::Sender<()> {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(frequency_secs));
            // the first tick completes immediately; consume it so every sweep
            // happens a full interval after the previous one
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        let swept = store.clean_sessions();
                        if swept > 0 {
                            info!("Session sweep evicted {} sessions", swept);
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        shutdown_tx
    }

    /// Run one eviction sweep now. Returns the number of sessions evicted.
    pub fn clean_sessions(&self) -> usize {
        self.store.clean_sessions()
    }

    /// Number of stored snapshots, valid or not.
    pub fn len(&self) -> usize {
        self.store.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.sessions.lock().unwrap().is_empty()
    }
}

impl<P: SessionPayload> SessionStore<P> {
    fn clean_sessions(&self) -> usize {
        let garbage: Vec<SessionRecord<P>> = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .values()
                .filter(|record| record.is_garbage())
                .cloned()
                .collect()
        };

        // close outside the lock: callbacks are user code and must not run
        // while the store is locked
        let swept = garbage.len();
        for record in garbage {
            self.close_record(record);
        }
        swept
    }

    /// Eviction-side counterpart of `Session::close` for records the sweep
    /// collected: fire callbacks, clear roles, destroy the payload, delete.
    fn close_record(&self, record: SessionRecord<P>) {
        debug!("Evicting stale session: {}", record.token);
        self.callbacks.call_all(&record.to_json());
        self.roles.revoke_all(&record.token);
        record.payload.on_destroy();
        self.sessions.lock().unwrap().remove(&record.token);
    }
}

impl<P: SessionPayload> SessionHandler<P> for SharedMapSessionHandler<P> {
    fn get_property(&self, name: &str) -> Option<String> {
        self.store.properties.get_property(name)
    }

    fn session_exists(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        self.store.sessions.lock().unwrap().contains_key(token)
    }

    fn generate_token(&self) -> String {
        self.generator.generate()
    }

    fn load_session(&self, token: &str) -> Option<SessionRecord<P>> {
        if token.is_empty() {
            return None;
        }
        let sessions = self.store.sessions.lock().unwrap();
        sessions.get(token).filter(|record| record.is_valid()).cloned()
    }

    fn save_session(&self, record: SessionRecord<P>) {
        if record.token.is_empty() {
            return;
        }
        self.store
            .sessions
            .lock()
            .unwrap()
            .insert(record.token.clone(), record);
    }

    fn delete_session(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.store.sessions.lock().unwrap().remove(token);
    }
}

impl<P: SessionPayload> Drop for SharedMapSessionHandler<P> {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.sweeper_shutdown.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

impl<P: SessionPayload> std::fmt::Debug for SharedMapSessionHandler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMapSessionHandler")
            .field("sessions", &self.len())
            .field("token_length", &self.generator.length())
            .field("sweeper", &self.sweeper_shutdown.is_some())
            .finish()
    }
}
