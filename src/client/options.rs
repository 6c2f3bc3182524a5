//! Composition of transport-ready options for one send.
//!
//! Headers are shallow-copied and the body fully buffered so the original
//! request value stays untouched and can be re-sent. The resulting
//! [`PreparedRequest`] plus the client built from it make exactly one
//! attempt: retries are an external concern.

use crate::auth::{self, AuthScheme};
use crate::client::{certificate, proxy};
use crate::cookies::FileCookieStore;
use crate::errors::EngineError;
use crate::models::{Headers, HttpRequest, RequestSettings};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Transport-ready options for a single send.
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: String,
    pub url: Url,
    /// Effective outgoing headers; mutated by pre-send auth transforms.
    pub headers: Headers,
    /// Fully buffered body bytes.
    pub body: Option<Vec<u8>>,
    pub scheme: AuthScheme,
    /// Server-streamed exchange (`Accept: text/event-stream`).
    pub streaming: bool,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub strict_ssl: bool,
    pub proxies: Vec<reqwest::Proxy>,
    pub identity: Option<reqwest::Identity>,
    pub use_cookies: bool,
}

/// Builds transport options from a request and a settings snapshot.
pub fn prepare(
    request: &HttpRequest,
    settings: &RequestSettings,
) -> Result<PreparedRequest, EngineError> {
    let url = parse_request_url(&request.url)?;

    // Shallow copy; the original request keeps its headers for a rerun.
    let mut headers = request.headers.clone();
    let scheme = auth::classify(&mut headers);

    if let AuthScheme::Basic { username, password } = &scheme {
        // RFC 7617 encoding of the structured credentials.
        let token = BASE64.encode(format!("{}:{}", username, password));
        headers.set("Authorization", format!("Basic {}", token));
    }

    let body = request.body.as_ref().map(|b| b.as_bytes().to_vec());
    let streaming = accepts_event_stream(&headers);
    let timeout = (settings.timeout_ms > 0).then(|| Duration::from_millis(settings.timeout_ms));
    let proxies = proxy::proxies_for(&url, settings)?;
    let identity = certificate::resolve_identity(&url, settings);

    Ok(PreparedRequest {
        method: request.method.clone(),
        url,
        headers,
        body,
        scheme,
        streaming,
        timeout,
        follow_redirects: settings.follow_redirects,
        strict_ssl: settings.strict_ssl,
        proxies,
        identity,
        use_cookies: settings.remember_cookies,
    })
}

/// Builds the HTTP client matching the prepared options.
pub fn build_client(
    prepared: &PreparedRequest,
    cookie_store: Option<Arc<FileCookieStore>>,
) -> Result<reqwest::Client, EngineError> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(!prepared.strict_ssl)
        .redirect(if prepared.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if let Some(timeout) = prepared.timeout {
        builder = builder.timeout(timeout);
    }
    for agent in prepared.proxies.iter().cloned() {
        builder = builder.proxy(agent);
    }
    if let Some(identity) = prepared.identity.clone() {
        builder = builder.identity(identity);
    }
    if prepared.use_cookies {
        if let Some(store) = cookie_store {
            builder = builder.cookie_provider(store);
        }
    }

    builder
        .build()
        .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// URLs may omit their scheme; `http://` is assumed.
fn parse_request_url(raw: &str) -> Result<Url, EngineError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{}", raw))
            .map_err(|e| EngineError::InvalidUrl(format!("{}: {}", raw, e))),
        Err(e) => Err(EngineError::InvalidUrl(format!("{}: {}", raw, e))),
    }
}

/// The streamed path is chosen when any comma-separated `Accept` token is
/// `text/event-stream`, compared case-insensitively and ignoring parameters.
fn accepts_event_stream(headers: &Headers) -> bool {
    headers.get("accept").is_some_and(|accept| {
        accept.split(',').any(|token| {
            token
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .eq_ignore_ascii_case("text/event-stream")
        })
    })
}
