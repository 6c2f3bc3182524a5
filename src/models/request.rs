//! Outgoing request value and its cooperative cancellation handle.

use crate::models::Headers;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Request body as provided by the caller.
///
/// Binary bodies are buffered fully into memory before the send; the
/// original value is never consumed so the same request can be re-sent.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Binary(Vec<u8>),
}

impl RequestBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RequestBody::Text(s) => s.as_bytes(),
            RequestBody::Binary(b) => b.as_slice(),
        }
    }

    /// Textual rendering used by the resolver and the request echo.
    pub fn as_text(&self) -> String {
        match self {
            RequestBody::Text(s) => s.clone(),
            RequestBody::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// Shared cancellation state between a request value and its in-flight send.
///
/// The token is replaced on every send ("rerun" replaces the handle); the
/// flag is sticky until the next send begins.
#[derive(Debug)]
struct CancelState {
    cancelled: AtomicBool,
    token: Mutex<CancellationToken>,
}

/// A parsed HTTP request as handed to the engine.
///
/// Created once per user-initiated send. The URL may omit its scheme;
/// `http://` is assumed at build time. At most one transport operation is
/// in flight for a request at a time.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    /// Optional name under which the response is cached for later
    /// path-expression references.
    pub name: Option<String>,
    cancel: Arc<CancelState>,
}

impl HttpRequest {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: Headers,
        body: Option<RequestBody>,
        name: Option<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers,
            body,
            name,
            cancel: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                token: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Requests cancellation of the in-flight transport operation, if any,
    /// and marks the request as cancelled.
    ///
    /// Cancellation is cooperative: already-buffered work may still settle.
    /// Callers must check [`is_cancelled`](Self::is_cancelled) after the
    /// send settles before treating a captured response as authoritative.
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::SeqCst);
        if let Ok(token) = self.cancel.token.lock() {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.cancelled.load(Ordering::SeqCst)
    }

    /// Request line plus headers plus body, used when a path expression
    /// stops at the whole-request level.
    pub fn to_display_string(&self) -> String {
        let body = self
            .body
            .as_ref()
            .map(RequestBody::as_text)
            .unwrap_or_default();
        format!(
            "{} {}\n{}\n\n{}",
            self.method,
            self.url,
            self.headers.to_display_string(),
            body
        )
    }

    /// Starts a new send: clears the cancelled flag and installs a fresh
    /// cancellation token, replacing any previous in-flight handle.
    pub(crate) fn begin_send(&self) -> CancellationToken {
        self.cancel.cancelled.store(false, Ordering::SeqCst);
        let fresh = CancellationToken::new();
        if let Ok(mut token) = self.cancel.token.lock() {
            *token = fresh.clone();
        }
        fresh
    }
}
