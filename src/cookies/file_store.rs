//! JSON-file-backed cookie store.
//!
//! Implements reqwest's `cookie::CookieStore` so the transport can read and
//! write cookies during a send, while every mutation is eagerly persisted to
//! a single JSON file. The store is internally synchronized and shared
//! between concurrent in-flight sends; writes are last-writer-wins.

use crate::cookies::CookieJar;
use http::HeaderValue;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use url::Url;

/// A persistent cookie store at a caller-provided file path.
///
/// The file is created lazily on first write. A missing or unreadable file
/// yields an empty jar rather than an error.
pub struct FileCookieStore {
    path: PathBuf,
    jar: RwLock<CookieJar>,
}

impl FileCookieStore {
    /// Opens (or initializes) the store at `path`.
    pub fn new(path: PathBuf) -> Self {
        let jar = Self::load(&path);
        Self {
            path,
            jar: RwLock::new(jar),
        }
    }

    fn load(path: &PathBuf) -> CookieJar {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => CookieJar::new(),
        }
    }

    /// Serializes the jar back to disk. Best effort: callers log persistence
    /// failures, never surface them to the send.
    fn persist(&self, jar: &CookieJar) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(jar)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Discards all cookies: the backing file is removed and the in-memory
    /// jar recreated empty.
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove cookie file {}: {}", self.path.display(), e);
            }
        }
        if let Ok(mut jar) = self.jar.write() {
            *jar = CookieJar::new();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jar.read().map(|jar| jar.is_empty()).unwrap_or(true)
    }
}

impl reqwest::cookie::CookieStore for FileCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let values: Vec<String> = cookie_headers
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return;
        }

        let Ok(mut jar) = self.jar.write() else {
            return;
        };
        jar.store_response_cookies(url, values.iter().map(String::as_str));
        if let Err(e) = self.persist(&jar) {
            log::warn!("Failed to persist cookies to {}: {}", self.path.display(), e);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let jar = self.jar.read().ok()?;
        let header = jar.request_cookies(url)?;
        HeaderValue::from_str(&header).ok()
    }
}
