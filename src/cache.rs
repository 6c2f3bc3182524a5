//! In-memory caches shared across sends.
//!
//! Both caches live on the engine instance and are passed explicitly to the
//! code that needs them; there are no process-wide statics. Concurrent
//! readers are expected (multiple in-flight sends); writes are
//! last-writer-wins.

use crate::models::HttpResponse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named request/response pairs captured for later variable resolution.
///
/// A response is cached under its request's name after a completed send and
/// consulted when a later request references `name.<...>`.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Arc<HttpResponse>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, response: HttpResponse) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(name.into(), Arc::new(response));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<HttpResponse>> {
        self.entries.read().ok()?.get(name).cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// Bearer tokens obtained from out-of-band sign-in exchanges, keyed by
/// credential identity so concurrent sends against the same pool reuse one
/// sign-in.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.tokens.read().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, token: impl Into<String>) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(key.into(), token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Headers, HttpRequest, Timings};

    fn response() -> HttpResponse {
        HttpResponse {
            status_code: 200,
            status_text: "OK".to_string(),
            http_version: "1.1".to_string(),
            headers: Headers::new(),
            body: String::new(),
            raw_body: Vec::new(),
            body_size: 0,
            headers_size: 0,
            timings: Timings::new(),
            request: HttpRequest::new("GET", "http://example.com", Headers::new(), None, None),
        }
    }

    #[test]
    fn response_cache_add_get_clear() {
        let cache = ResponseCache::new();
        assert!(cache.get("login").is_none());

        cache.add("login", response());
        assert_eq!(cache.get("login").unwrap().status_code, 200);

        cache.clear();
        assert!(cache.get("login").is_none());
    }

    #[test]
    fn last_writer_wins() {
        let cache = TokenCache::new();
        cache.set("pool:client:user", "token-a");
        cache.set("pool:client:user", "token-b");
        assert_eq!(cache.get("pool:client:user").as_deref(), Some("token-b"));
    }
}
