//! Token transport: how a token travels between client and session layer.
//!
//! The HTTP stack itself is the host's business; these traits and helpers are
//! the seam it plugs into. Malformed input of any kind reads as an absent
//! token, never an error.

use serde::{Deserialize, Serialize};

/// Where the session token is stored on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSupport {
    /// Token travels in a cookie under the configured label.
    Cookie,
    /// Token travels as a query-string parameter.
    Query,
    /// Token travels as a string field of a JSON request body.
    Json,
}

impl std::fmt::Display for TokenSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSupport::Cookie => write!(f, "cookie"),
            TokenSupport::Query => write!(f, "query"),
            TokenSupport::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for TokenSupport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cookie" => Ok(TokenSupport::Cookie),
            "query" => Ok(TokenSupport::Query),
            "json" => Ok(TokenSupport::Json),
            _ => Err(format!("Unknown token support: {}", s)),
        }
    }
}

/// Read-side view of an inbound request, as much of it as token extraction
/// needs. Implement this for your framework's request type.
pub trait TokenRequest {
    /// Raw `Cookie` header value, if present.
    fn cookie_header(&self) -> Option<&str> {
        None
    }

    /// Raw query string, without the leading `?`.
    fn query_string(&self) -> Option<&str> {
        None
    }

    /// Parsed JSON body, if the request carried one.
    fn body_json(&self) -> Option<&serde_json::Value> {
        None
    }
}

/// Write-side hook for advertising a freshly minted token back to the client.
pub trait ResponseSink {
    fn append_header(&mut self, name: &str, value: &str);
}

/// Extract the cookie named `label` from a raw `Cookie` header.
pub fn token_from_cookie_header(header: &str, label: &str) -> Option<String> {
    for cookie in header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == label && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Extract the parameter named `label` from an `&`-separated query string.
/// The value is percent-decoded; when a parameter repeats, the last
/// occurrence wins.
pub fn token_from_query(query: &str, label: &str) -> Option<String> {
    for pair in query.split('&').rev() {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if name == label {
            return urlencoding::decode(value).ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Extract the string field named `label` from a parsed JSON object.
/// Non-object bodies and non-string fields read as absent.
pub fn token_from_json(body: &serde_json::Value, label: &str) -> Option<String> {
    body.as_object()?
        .get(label)?
        .as_str()
        .map(|s| s.to_string())
}

/// Minimal [`TokenRequest`] implementation for tests and embedders without a
/// framework request type.
#[derive(Debug, Clone, Default)]
pub struct PlainRequest {
    cookies: Option<String>,
    query: Option<String>,
    body: Option<serde_json::Value>,
}

impl PlainRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie_header(mut self, header: &str) -> Self {
        self.cookies = Some(header.to_string());
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl TokenRequest for PlainRequest {
    fn cookie_header(&self) -> Option<&str> {
        self.cookies.as_deref()
    }

    fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn body_json(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// [`ResponseSink`] that records appended headers.
#[derive(Debug, Default)]
pub struct RecordedResponse {
    headers: Vec<(String, String)>,
}

impl RecordedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// First recorded value for `name`, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl ResponseSink for RecordedResponse {
    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }
}
