//! Engine facade: one instance owns the persistent cookie store, the
//! per-process auth-token cache and the named-response cache.
//!
//! The engine itself holds no per-send state; any number of sends may be in
//! flight concurrently, each with its own request value and cancellation
//! handle. The shared stores tolerate concurrent access with
//! last-writer-wins semantics.

use crate::cache::{ResponseCache, TokenCache};
use crate::client::transport::{self, SendOutcome};
use crate::cookies::FileCookieStore;
use crate::errors::EngineError;
use crate::models::{HttpRequest, HttpResponse, RequestSettings, ResolveResult};
use crate::resolver;
use std::path::PathBuf;
use std::sync::Arc;

pub struct RequestEngine {
    cookie_store: Arc<FileCookieStore>,
    token_cache: TokenCache,
    response_cache: ResponseCache,
}

impl RequestEngine {
    /// Creates an engine whose cookies persist at `cookie_file_path`. The
    /// file is created lazily on the first cookie write.
    pub fn new(cookie_file_path: PathBuf) -> Self {
        Self {
            cookie_store: Arc::new(FileCookieStore::new(cookie_file_path)),
            token_cache: TokenCache::new(),
            response_cache: ResponseCache::new(),
        }
    }

    /// Executes one request end to end.
    ///
    /// Cancellation is checked again after the transport settles: a cancel
    /// that lands between the last read and the return still reports
    /// `Cancelled` rather than a completed response. Completed responses of
    /// named requests are captured for later path-expression references.
    pub async fn send(
        &self,
        request: &HttpRequest,
        settings: &RequestSettings,
    ) -> Result<SendOutcome, EngineError> {
        let cookie_store = settings
            .remember_cookies
            .then(|| Arc::clone(&self.cookie_store));

        let outcome =
            transport::execute(request, settings, cookie_store, &self.token_cache).await?;

        match outcome {
            SendOutcome::Completed(response) => {
                if request.is_cancelled() {
                    return Ok(SendOutcome::Cancelled { partial: None });
                }
                if let Some(name) = &request.name {
                    self.response_cache.add(name.clone(), response.clone());
                }
                Ok(SendOutcome::Completed(response))
            }
            cancelled => Ok(cancelled),
        }
    }

    /// Resolves a path expression such as `login.response.body.$.token`
    /// against the named-response cache.
    pub fn resolve_variable(&self, path_expression: &str) -> ResolveResult {
        let name = path_expression.split('.').next().unwrap_or_default();
        let captured = self.response_cache.get(name);
        resolver::resolve(captured.as_deref(), path_expression)
    }

    /// The captured response for `name`, if that request has completed.
    pub fn captured_response(&self, name: &str) -> Option<Arc<HttpResponse>> {
        self.response_cache.get(name)
    }

    /// Drops all persisted cookies, removing the backing file.
    pub fn clear_cookies(&self) {
        self.cookie_store.clear();
    }

    /// Drops cached auth tokens and captured responses.
    pub fn clear_caches(&self) {
        self.token_cache.clear();
        self.response_cache.clear();
    }
}
