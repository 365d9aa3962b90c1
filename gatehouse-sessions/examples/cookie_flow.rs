//! Walk a client through the cookie flow: first contact mints a session and
//! advertises the token, the return visit resumes it, closing tears it down.
//!
//! Run with: cargo run --example cookie_flow

use gatehouse_core::{init_logging, LoggingConfig, MapProperties};
use gatehouse_sessions::properties::keys;
use gatehouse_sessions::{
    CloseCallbacks, MapRoleStore, PlainRequest, RecordedResponse, RoleStore, Session,
    SessionCapabilities, SessionHandler, SimpleSessionHandler,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::default()).map_err(anyhow::Error::from_boxed)?;

    let properties = Arc::new(
        MapProperties::new()
            .with(keys::SESSION_TOKEN_LABEL, "gatehouse_sid")
            .with(keys::SESSION_TIMEOUT, "300")
            .with(keys::SESSION_CLEAN_FREQUENCY, "30"),
    );
    let roles = Arc::new(MapRoleStore::new());
    let callbacks = Arc::new(CloseCallbacks::new());
    callbacks.register("audit", |state| {
        info!("Session closed with state: {}", state);
    });

    let handler = Arc::new(SimpleSessionHandler::new(
        properties,
        Arc::clone(&roles) as Arc<dyn RoleStore>,
        Arc::clone(&callbacks),
    ));
    let caps = SessionCapabilities::new(
        handler as Arc<dyn SessionHandler<()>>,
        roles as Arc<dyn RoleStore>,
        callbacks,
    );

    // first contact: no cookie yet
    let request = PlainRequest::new();
    let mut response = RecordedResponse::new();
    let session = Session::from_request(caps.clone(), &request, &mut response)?;
    let token = session.token().to_string();
    info!("Issued session {}", token);
    info!(
        "Advertised to client: Set-Cookie: {}",
        response.header("Set-Cookie").unwrap_or("<none>")
    );

    session.roles().assign(&token, "visitor");

    // the client returns with the cookie
    let request =
        PlainRequest::new().with_cookie_header(&format!("gatehouse_sid={}", token));
    let mut response = RecordedResponse::new();
    let mut resumed = Session::from_request(caps, &request, &mut response)?;
    info!(
        "Resumed session {} (visitor role: {})",
        resumed.token(),
        resumed.roles().has(resumed.token(), "visitor")
    );

    resumed.close();
    Ok(())
}
