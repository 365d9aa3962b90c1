//! Gatehouse Sessions - session identity layer
//!
//! Gives every inbound client a durable, TTL-bounded identity (a token)
//! backed by an in-process, concurrency-safe store, and provides the
//! lifecycle other subsystems build on:
//!
//! - [`Session`]: the lifecycle state machine (open, update, load, close)
//! - [`SessionHandler`]: the storage contract sessions delegate to
//! - [`SharedMapSessionHandler`]: the default lock-guarded store with a
//!   background eviction sweep
//! - Session variants: [`SimpleSession`] (pure identity) and
//!   [`StorageSession`] (adds a per-session key/value cache)
//!
//! ## Architecture
//!
//! Sessions are plain values. Everything a session needs from the outside
//! world travels in an explicit [`SessionCapabilities`] bundle supplied at
//! construction: the storage handler, the role store and the close-callback
//! registry. The store keeps immutable [`SessionRecord`] snapshots; a session
//! held by request-handling code is a private copy whose mutations publish
//! only through [`Session::update`].

pub mod callbacks;
pub mod cache;
pub mod handler;
pub mod properties;
pub mod record;
pub mod roles;
pub mod session;
pub mod shared_map;
pub mod transport;

pub use callbacks::CloseCallbacks;
pub use cache::SessionCache;
pub use handler::{SessionHandler, TokenGenerator};
pub use record::{SessionPayload, SessionRecord};
pub use roles::{MapRoleStore, RoleStore};
pub use session::{Session, SessionCapabilities, SimpleSession, StorageSession};
pub use shared_map::SharedMapSessionHandler;
pub use transport::{
    token_from_cookie_header, token_from_json, token_from_query, PlainRequest, RecordedResponse,
    ResponseSink, TokenRequest, TokenSupport,
};

/// Shared-map store for [`SimpleSession`]s.
pub type SimpleSessionHandler = SharedMapSessionHandler<()>;
/// Shared-map store for [`StorageSession`]s.
pub type StorageSessionHandler = SharedMapSessionHandler<SessionCache>;

/// Session-layer error type
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token generation kept colliding with stored sessions. This is the one
    /// session-layer failure that surfaces to callers instead of degrading
    /// into a fresh session.
    #[error("token space exhausted: {attempts} generated tokens already in use")]
    TokenSpaceExhausted { attempts: usize },

    #[error("Core error: {0}")]
    Core(#[from] gatehouse_core::GatehouseError),
}

pub type SessionResult<T> = Result<T, SessionError>;
