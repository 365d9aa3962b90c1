//! Session snapshots and validity predicates.

use chrono::{DateTime, Utc};
use serde_json::json;

/// Variant-specific auxiliary payload carried by a session.
///
/// The simple variant uses `()`; the storage variant uses
/// [`SessionCache`](crate::SessionCache). Payloads are cloned into every
/// snapshot, so a payload that shares state across snapshots must do so
/// through its own interior reference.
pub trait SessionPayload: Clone + Default + Send + Sync + 'static {
    /// JSON projection of the payload, handed to close callbacks as part of
    /// the session's final state.
    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Called once when the owning session is closed or evicted.
    fn on_destroy(&self) {}
}

impl SessionPayload for () {}

/// Immutable, fully-populated copy of a session at the instant of an update.
///
/// Records are what the store holds; the live [`Session`](crate::Session) a
/// request handler works with is an independent copy. Validity is evaluated
/// lazily, on load and at sweep time, never by a hard timer.
#[derive(Debug, Clone)]
pub struct SessionRecord<P> {
    /// Opaque unique token naming the session. Never empty once stored.
    pub token: String,
    /// Timestamp of the last refresh.
    pub update_time: DateTime<Utc>,
    /// Seconds until stale; negative means the session never expires.
    pub session_timeout: i64,
    /// Extra grace seconds before a stale record becomes sweep-eligible.
    pub clean_extra_timeout: i64,
    /// Variant-specific payload.
    pub payload: P,
}

/// Shared timeout predicate: true once more than `timeout + extra` seconds
/// have elapsed since `update_time`. Negative timeouts never expire.
pub(crate) fn timed_out(update_time: DateTime<Utc>, timeout: i64, extra_seconds: i64) -> bool {
    if timeout < 0 {
        return false;
    }
    (Utc::now() - update_time).num_seconds() > timeout + extra_seconds
}

impl<P: SessionPayload> SessionRecord<P> {
    pub fn is_timed_out_after(&self, extra_seconds: i64) -> bool {
        timed_out(self.update_time, self.session_timeout, extra_seconds)
    }

    pub fn is_timed_out(&self) -> bool {
        self.is_timed_out_after(0)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_timed_out()
    }

    /// A record is garbage once it has been stale for the configured grace
    /// window. With the default grace of zero this coincides with invalid.
    pub fn is_garbage(&self) -> bool {
        self.is_timed_out_after(self.clean_extra_timeout)
    }

    /// Caller-visible representation handed to close callbacks.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "token": self.token,
            "update_time": self.update_time.to_rfc3339(),
            "session_timeout": self.session_timeout,
            "data": self.payload.to_json(),
        })
    }
}
