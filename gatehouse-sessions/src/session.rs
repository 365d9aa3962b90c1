//! Session entity and lifecycle state machine.

use crate::callbacks::CloseCallbacks;
use crate::cache::SessionCache;
use crate::handler::SessionHandler;
use crate::properties::{defaults, keys};
use crate::record::{timed_out, SessionPayload, SessionRecord};
use crate::roles::RoleStore;
use crate::transport::{self, ResponseSink, TokenRequest, TokenSupport};
use crate::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Session with no auxiliary payload: pure identity.
pub type SimpleSession = Session<()>;

/// Session carrying a per-instance key/value cache.
pub type StorageSession = Session<SessionCache>;

/// Everything a session needs from the outside world, supplied explicitly at
/// construction: where sessions live, who tracks roles, and who wants to know
/// when a session closes.
pub struct SessionCapabilities<P: SessionPayload> {
    pub handler: Arc<dyn SessionHandler<P>>,
    pub roles: Arc<dyn RoleStore>,
    pub callbacks: Arc<CloseCallbacks>,
}

impl<P: SessionPayload> SessionCapabilities<P> {
    pub fn new(
        handler: Arc<dyn SessionHandler<P>>,
        roles: Arc<dyn RoleStore>,
        callbacks: Arc<CloseCallbacks>,
    ) -> Self {
        Self {
            handler,
            roles,
            callbacks,
        }
    }
}

impl<P: SessionPayload> Clone for SessionCapabilities<P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            roles: Arc::clone(&self.roles),
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

/// A client's durable, TTL-bounded identity.
///
/// The live session is a private value; the store only ever sees the
/// immutable snapshots [`update`](Session::update) publishes. Timeout
/// enforcement happens when validity is evaluated, not by a timer: a
/// timed-out session can remain stored, reading as absent, until the sweep
/// visits it.
pub struct Session<P: SessionPayload> {
    token: String,
    update_time: DateTime<Utc>,
    token_label: String,
    /// Resolved lazily: the cookie flow defaults to cookie transport, the
    /// request-only flow to query transport.
    token_support: Option<TokenSupport>,
    session_timeout: i64,
    clean_extra_timeout: i64,
    closed: bool,
    payload: P,
    caps: SessionCapabilities<P>,
}

impl<P: SessionPayload> Session<P> {
    /// Create an unopened session. Configuration is read once, through the
    /// handler's property provider.
    pub fn new(caps: SessionCapabilities<P>) -> Self {
        let token_label = caps
            .handler
            .get_property(keys::SESSION_TOKEN_LABEL)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| defaults::TOKEN_LABEL.to_string());
        let token_support = caps
            .handler
            .get_property(keys::SESSION_TOKEN_SUPPORT)
            .and_then(|raw| raw.parse().ok());
        let session_timeout = gatehouse_core::parse_or_default(
            caps.handler.get_property(keys::SESSION_TIMEOUT),
            keys::SESSION_TIMEOUT,
            defaults::SESSION_TIMEOUT,
        );
        let clean_extra_timeout = gatehouse_core::parse_or_default(
            caps.handler.get_property(keys::SESSION_CLEAN_EXTRA_TIMEOUT),
            keys::SESSION_CLEAN_EXTRA_TIMEOUT,
            defaults::CLEAN_EXTRA_TIMEOUT,
        );

        Self {
            token: String::new(),
            update_time: Utc::now(),
            token_label,
            token_support,
            session_timeout,
            clean_extra_timeout,
            closed: false,
            payload: P::default(),
            caps,
        }
    }

    /// Create a session and try to adopt the stored snapshot for `token`.
    /// When no valid snapshot exists the session is simply left unopened.
    pub fn from_token(caps: SessionCapabilities<P>, token: &str) -> Self {
        let mut session = Self::new(caps);
        session.load(token);
        session
    }

    /// Create a session from an inbound request (cookie flow). A session
    /// always exists afterward: a missing or stale token opens a fresh one
    /// and advertises it through `response`.
    pub fn from_request(
        caps: SessionCapabilities<P>,
        request: &dyn TokenRequest,
        response: &mut dyn ResponseSink,
    ) -> SessionResult<Self> {
        let mut session = Self::new(caps);
        session.load_from_request(request, response)?;
        Ok(session)
    }

    /// Open a new session with a unique token.
    ///
    /// Any prior association is closed first. Token uniqueness is enforced by
    /// check-then-retry against the store; after
    /// [`defaults::MAX_TOKEN_ATTEMPTS`] consecutive collisions the token
    /// space is considered exhausted and the error surfaces.
    pub fn open(&mut self) -> SessionResult<()> {
        self.close();

        for attempt in 1..=defaults::MAX_TOKEN_ATTEMPTS {
            let candidate = self.caps.handler.generate_token();
            if self.caps.handler.session_exists(&candidate) {
                debug!(attempt, "Generated token already in use, retrying");
                continue;
            }
            self.token = candidate;
            self.closed = false;
            self.update();
            info!("Opened session: {}", self.token);
            return Ok(());
        }

        Err(SessionError::TokenSpaceExhausted {
            attempts: defaults::MAX_TOKEN_ATTEMPTS,
        })
    }

    /// [`open`](Session::open), then advertise the token back to the client
    /// as a `Set-Cookie` header when the effective transport is cookie.
    pub fn open_with(&mut self, response: &mut dyn ResponseSink) -> SessionResult<()> {
        self.open()?;
        if self.effective_support(TokenSupport::Cookie) == TokenSupport::Cookie {
            response.append_header(
                "Set-Cookie",
                &format!("{}={}; path=/", self.token_label, self.token),
            );
        }
        Ok(())
    }

    /// Refresh the session: set the update time to now and publish a new
    /// immutable snapshot to the store. Keeps the session alive.
    pub fn update(&mut self) {
        self.update_time = Utc::now();
        self.caps.handler.save_session(self.record());
    }

    /// Close the session: fire close callbacks with the final state, clear
    /// its roles, destroy the payload and delete the store entry. Closing an
    /// already-closed or never-opened session is a no-op.
    pub fn close(&mut self) {
        if self.closed || self.token.is_empty() {
            return;
        }
        self.closed = true;

        let state = self.record().to_json();
        self.caps.callbacks.call_all(&state);
        self.caps.roles.revoke_all(&self.token);
        self.payload.on_destroy();
        self.caps.handler.delete_session(&self.token);
        info!("Closed session: {}", self.token);
    }

    /// Adopt the stored snapshot for `token` and refresh it, keeping the
    /// session alive. Absent or invalid snapshots leave this instance
    /// untouched and return false.
    pub fn load(&mut self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.caps.handler.load_session(token) {
            Some(record) => {
                self.adopt(record);
                self.update();
                true
            }
            None => false,
        }
    }

    /// Cookie flow: extract the candidate token from the request's cookies
    /// and load it; when that fails, open a fresh session and advertise it
    /// through `response`. Always leaves a usable session behind.
    ///
    /// When the configured transport is not cookie, this delegates to the
    /// request-only flow and reports its result.
    pub fn load_from_request(
        &mut self,
        request: &dyn TokenRequest,
        response: &mut dyn ResponseSink,
    ) -> SessionResult<bool> {
        if self.effective_support(TokenSupport::Cookie) == TokenSupport::Cookie {
            let loaded = request
                .cookie_header()
                .and_then(|header| transport::token_from_cookie_header(header, &self.token_label))
                .map(|token| self.load(&token))
                .unwrap_or(false);
            if !loaded {
                self.open_with(response)?;
            }
            return Ok(true);
        }
        Ok(self.load_from(request))
    }

    /// Request-only flow: extract the candidate token per the configured
    /// transport (query string or JSON body) and load it. Whether to open a
    /// fresh session on failure is the caller's decision.
    pub fn load_from(&mut self, request: &dyn TokenRequest) -> bool {
        let candidate = match self.effective_support(TokenSupport::Query) {
            TokenSupport::Query => request
                .query_string()
                .and_then(|query| transport::token_from_query(query, &self.token_label)),
            TokenSupport::Json => request
                .body_json()
                .and_then(|body| transport::token_from_json(body, &self.token_label)),
            // cookie transport has no request-only extraction
            TokenSupport::Cookie => None,
        };
        match candidate {
            Some(token) => self.load(&token),
            None => false,
        }
    }

    pub fn is_timed_out_after(&self, extra_seconds: i64) -> bool {
        timed_out(self.update_time, self.session_timeout, extra_seconds)
    }

    pub fn is_timed_out(&self) -> bool {
        self.is_timed_out_after(0)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_timed_out()
    }

    pub fn is_garbage(&self) -> bool {
        self.is_timed_out_after(self.clean_extra_timeout)
    }

    /// Build the immutable snapshot of the current state, payload included.
    pub fn record(&self) -> SessionRecord<P> {
        SessionRecord {
            token: self.token.clone(),
            update_time: self.update_time,
            session_timeout: self.session_timeout,
            clean_extra_timeout: self.clean_extra_timeout,
            payload: self.payload.clone(),
        }
    }

    fn adopt(&mut self, record: SessionRecord<P>) {
        self.token = record.token;
        self.update_time = record.update_time;
        self.session_timeout = record.session_timeout;
        self.clean_extra_timeout = record.clean_extra_timeout;
        self.payload = record.payload;
        self.closed = false;
    }

    /// Resolve the transport, remembering the flow-dependent default the
    /// first time it is needed.
    fn effective_support(&mut self, flow_default: TokenSupport) -> TokenSupport {
        *self.token_support.get_or_insert(flow_default)
    }

    /// The session's unique token. Empty until opened.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    /// Overwrite the last refresh time without publishing a snapshot.
    pub fn set_update_time(&mut self, update_time: DateTime<Utc>) {
        self.update_time = update_time;
    }

    pub fn session_timeout(&self) -> i64 {
        self.session_timeout
    }

    pub fn token_label(&self) -> &str {
        &self.token_label
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn roles(&self) -> &Arc<dyn RoleStore> {
        &self.caps.roles
    }

    pub fn close_callbacks(&self) -> &Arc<CloseCallbacks> {
        &self.caps.callbacks
    }
}

impl StorageSession {
    /// Read a value from the session's key/value cache.
    pub fn read(&self, key: &str) -> Option<String> {
        self.payload.read(key)
    }

    /// Write a value into the cache. Takes effect in the store only when the
    /// next [`update`](Session::update) publishes a snapshot carrying the
    /// cache reference.
    pub fn write(&self, key: &str, value: &str) {
        self.payload.write(key, value);
    }

    /// Remove a value from the cache.
    pub fn destroy(&self, key: &str) {
        self.payload.destroy(key);
    }
}

impl<P: SessionPayload> std::fmt::Debug for Session<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("update_time", &self.update_time)
            .field("session_timeout", &self.session_timeout)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SessionRecord;
    use crate::roles::MapRoleStore;
    use crate::shared_map::SharedMapSessionHandler;
    use crate::transport::{PlainRequest, RecordedResponse};
    use gatehouse_core::MapProperties;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn caps_with(properties: MapProperties) -> SessionCapabilities<()> {
        let properties = Arc::new(properties.with(keys::SESSION_CLEAN_FREQUENCY, "-1"));
        let roles = Arc::new(MapRoleStore::new());
        let callbacks = Arc::new(CloseCallbacks::new());
        let handler = Arc::new(SharedMapSessionHandler::new(
            properties,
            Arc::clone(&roles) as Arc<dyn RoleStore>,
            Arc::clone(&callbacks),
        ));
        SessionCapabilities::new(handler, roles, callbacks)
    }

    fn caps() -> SessionCapabilities<()> {
        caps_with(MapProperties::new())
    }

    #[test]
    fn open_then_load_round_trip() {
        let caps = caps();
        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let token = session.token().to_string();
        assert!(!token.is_empty());

        let mut other = Session::new(caps);
        assert!(other.load(&token));
        assert_eq!(other.token(), token);
        assert!((other.update_time() - session.update_time()).num_seconds() <= 1);
    }

    #[test]
    fn load_refreshes_the_stored_snapshot() {
        let caps = caps_with(MapProperties::new().with(keys::SESSION_TIMEOUT, "3600"));
        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let token = session.token().to_string();

        // age the stored snapshot just shy of the timeout
        session.set_update_time(Utc::now() - chrono::Duration::seconds(3599));
        session.caps.handler.save_session(session.record());

        let mut other = Session::new(caps.clone());
        assert!(other.load(&token));

        // refresh-on-read pushed a new snapshot
        let stored = caps.handler.load_session(&token).expect("snapshot expected");
        assert!((Utc::now() - stored.update_time).num_seconds() <= 1);
    }

    #[test]
    fn loading_a_stale_snapshot_fails_without_mutation() {
        let caps = caps_with(MapProperties::new().with(keys::SESSION_TIMEOUT, "5"));
        let stale = SessionRecord {
            token: "stale".to_string(),
            update_time: Utc::now() - chrono::Duration::seconds(6),
            session_timeout: 5,
            clean_extra_timeout: 0,
            payload: (),
        };
        caps.handler.save_session(stale);

        let mut session = Session::new(caps);
        assert!(!session.load("stale"));
        assert_eq!(session.token(), "");
    }

    #[test]
    fn close_is_idempotent() {
        let fired = Arc::new(AtomicUsize::new(0));
        let caps = caps();
        {
            let fired = Arc::clone(&fired);
            caps.callbacks.register("count", move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let token = session.token().to_string();
        caps.roles.assign(&token, "admin");

        session.close();
        session.close();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!caps.handler.session_exists(&token));
        assert!(!caps.roles.has(&token, "admin"));
        assert!(session.is_closed());
    }

    #[test]
    fn close_callbacks_see_the_final_state() {
        let seen = Arc::new(Mutex::new(None::<serde_json::Value>));
        let caps = caps();
        {
            let seen = Arc::clone(&seen);
            caps.callbacks.register("capture", move |state| {
                *seen.lock().unwrap() = Some(state.clone());
            });
        }

        let mut session = Session::new(caps);
        session.open().expect("open should succeed");
        let token = session.token().to_string();
        session.close();

        let state = seen.lock().unwrap().clone().expect("callback should fire");
        assert_eq!(state["token"], token.as_str());
    }

    #[test]
    fn reopening_closes_the_previous_association() {
        let caps = caps();
        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let first = session.token().to_string();

        session.open().expect("reopen should succeed");
        let second = session.token().to_string();

        assert_ne!(first, second);
        assert!(!caps.handler.session_exists(&first));
        assert!(caps.handler.session_exists(&second));
        assert!(!session.is_closed());
    }

    /// Handler whose generated tokens always collide.
    struct CollidingHandler;

    impl SessionHandler<()> for CollidingHandler {
        fn get_property(&self, _name: &str) -> Option<String> {
            None
        }
        fn session_exists(&self, _token: &str) -> bool {
            true
        }
        fn generate_token(&self) -> String {
            "collision".to_string()
        }
        fn load_session(&self, _token: &str) -> Option<SessionRecord<()>> {
            None
        }
        fn save_session(&self, _record: SessionRecord<()>) {}
        fn delete_session(&self, _token: &str) {}
    }

    #[test]
    fn token_exhaustion_surfaces_after_bounded_retries() {
        let caps = SessionCapabilities::new(
            Arc::new(CollidingHandler),
            Arc::new(MapRoleStore::new()),
            Arc::new(CloseCallbacks::new()),
        );
        let mut session = Session::new(caps);

        let err = session.open().expect_err("open should exhaust the token space");
        assert!(matches!(
            err,
            SessionError::TokenSpaceExhausted {
                attempts: defaults::MAX_TOKEN_ATTEMPTS
            }
        ));
        assert_eq!(session.token(), "");
    }

    #[test]
    fn open_with_advertises_a_cookie() {
        let caps = caps_with(MapProperties::new().with(keys::SESSION_TOKEN_LABEL, "sid"));
        let mut session = Session::new(caps);
        let mut response = RecordedResponse::new();
        session.open_with(&mut response).expect("open should succeed");

        let cookie = response.header("Set-Cookie").expect("cookie expected");
        assert_eq!(cookie, format!("sid={}; path=/", session.token()));
    }

    #[test]
    fn query_flow_loads_by_label() {
        let caps = caps_with(
            MapProperties::new()
                .with(keys::SESSION_TOKEN_SUPPORT, "query")
                .with(keys::SESSION_TOKEN_LABEL, "sid"),
        );
        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let token = session.token().to_string();

        let mut other = Session::new(caps.clone());
        let request = PlainRequest::new().with_query(&format!("a=1&sid={}", token));
        assert!(other.load_from(&request));
        assert_eq!(other.token(), token);

        let mut third = Session::new(caps);
        let request = PlainRequest::new().with_query("a=1&b=2");
        assert!(!third.load_from(&request));
    }

    #[test]
    fn json_flow_loads_by_label() {
        let caps = caps_with(
            MapProperties::new()
                .with(keys::SESSION_TOKEN_SUPPORT, "json")
                .with(keys::SESSION_TOKEN_LABEL, "sid"),
        );
        let mut session = Session::new(caps.clone());
        session.open().expect("open should succeed");
        let token = session.token().to_string();

        let mut other = Session::new(caps);
        let request = PlainRequest::new().with_body(serde_json::json!({ "sid": token }));
        assert!(other.load_from(&request));
        assert_eq!(other.token(), token);
    }

    #[test]
    fn properties_shape_the_session() {
        let caps = caps_with(
            MapProperties::new()
                .with(keys::SESSION_TIMEOUT, "not-a-number")
                .with(keys::SESSION_TOKEN_LABEL, ""),
        );
        let session = Session::new(caps);

        // malformed numbers and empty labels fall back to defaults
        assert_eq!(session.session_timeout(), defaults::SESSION_TIMEOUT);
        assert_eq!(session.token_label(), defaults::TOKEN_LABEL);
    }
}
