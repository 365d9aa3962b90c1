//! Storage contract consumed by sessions.

use crate::record::{SessionPayload, SessionRecord};

/// Abstracts where sessions live.
///
/// Sessions delegate every storage decision here: token generation, existence
/// checks, snapshot load/save/delete and configuration lookup. The default
/// implementation is [`SharedMapSessionHandler`]; an implementation backed by
/// an external store only needs to honor the same contract.
///
/// `generate_token` gives no uniqueness guarantee on its own — uniqueness is
/// enforced by the caller through the existence-check-then-retry loop in
/// [`Session::open`].
///
/// [`SharedMapSessionHandler`]: crate::SharedMapSessionHandler
/// [`Session::open`]: crate::Session::open
pub trait SessionHandler<P: SessionPayload>: Send + Sync {
    /// Configuration lookup for sessions bound to this handler.
    fn get_property(&self, name: &str) -> Option<String>;

    /// Whether a session with this token is currently stored.
    fn session_exists(&self, token: &str) -> bool;

    /// Produce a candidate token. No uniqueness guarantee.
    fn generate_token(&self) -> String;

    /// Find a stored snapshot for `token`. Stored-but-invalid snapshots are
    /// reported as absent even though they are not yet physically evicted.
    fn load_session(&self, token: &str) -> Option<SessionRecord<P>>;

    /// Upsert a snapshot keyed by its own token. Empty tokens are ignored.
    fn save_session(&self, record: SessionRecord<P>);

    /// Remove the snapshot stored under `token`, if any.
    fn delete_session(&self, token: &str);
}

/// Fixed-length random token source.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn generate(&self) -> String {
        (0..self.length).map(|_| fastrand::alphanumeric()).collect()
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_requested_length() {
        let generator = TokenGenerator::new(32);
        let token = generator.generate();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn consecutive_tokens_differ() {
        let generator = TokenGenerator::new(32);
        assert_ne!(generator.generate(), generator.generate());
    }
}
