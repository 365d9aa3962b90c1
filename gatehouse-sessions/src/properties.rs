//! Property keys and compiled-in defaults for the session layer.

/// Property names resolved through the configured [`PropertyProvider`].
///
/// [`PropertyProvider`]: gatehouse_core::PropertyProvider
pub mod keys {
    /// Cookie/field name the token travels under.
    pub const SESSION_TOKEN_LABEL: &str = "session_token_label";
    /// Where the token travels: `cookie` | `query` | `json`.
    pub const SESSION_TOKEN_SUPPORT: &str = "session_token_support";
    /// Seconds until a session goes stale; negative never expires.
    pub const SESSION_TIMEOUT: &str = "session_timeout";
    /// Seconds between eviction sweeps; negative disables sweeping.
    pub const SESSION_CLEAN_FREQUENCY: &str = "session_clean_frequency";
    /// Length of generated tokens.
    pub const SESSION_TOKEN_LENGTH: &str = "session_token_length";
    /// Extra grace seconds a stale session survives before eviction.
    pub const SESSION_CLEAN_EXTRA_TIMEOUT: &str = "session_clean_extra_timeout";
}

/// Fallbacks used when a property is absent or malformed.
pub mod defaults {
    pub const TOKEN_LABEL: &str = "token";
    pub const SESSION_TIMEOUT: i64 = 86_400;
    pub const CLEAN_FREQUENCY: i64 = 60;
    pub const TOKEN_LENGTH: usize = 32;
    pub const CLEAN_EXTRA_TIMEOUT: i64 = 0;
    /// Bound on token-collision retries in [`Session::open`].
    ///
    /// [`Session::open`]: crate::Session::open
    pub const MAX_TOKEN_ATTEMPTS: usize = 10;
}
