//! Cookie persistence.
//!
//! The engine owns a single pluggable, file-backed cookie store; the jar is
//! attached to a send only when cookie persistence is enabled in the
//! settings. The store survives the process lifetime and separate send
//! invocations against the same store path; clearing cookies discards the
//! backing file and recreates an empty jar.
//!
//! Parsing handles the subset of RFC 6265 `Set-Cookie` semantics the engine
//! needs: `Path`, `Domain`, `Secure`, `HttpOnly`, `Expires` (stored, not
//! enforced). Cookies are bucketed by origin with simple host/path matching.

mod file_store;

pub use file_store::FileCookieStore;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// One stored cookie record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<String>,
}

/// In-memory cookie state, bucketed by request origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieJar {
    entries: HashMap<String, Vec<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores all `Set-Cookie` values received for `url`, replacing existing
    /// cookies with the same name in the same origin bucket.
    pub fn store_response_cookies<'a>(
        &mut self,
        url: &Url,
        set_cookie_values: impl Iterator<Item = &'a str>,
    ) {
        let origin = url.origin().ascii_serialization();
        let default_path = url
            .path()
            .rsplit_once('/')
            .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
            .to_string();

        let bucket = self.entries.entry(origin).or_default();

        for header in set_cookie_values {
            let Some(mut cookie) = parse_set_cookie(header) else {
                continue;
            };
            if cookie.path.is_none() {
                cookie.path = Some(default_path.clone());
            }

            if let Some(existing) = bucket.iter_mut().find(|c| c.name == cookie.name) {
                *existing = cookie;
            } else {
                bucket.push(cookie);
            }
        }
    }

    /// Returns the `Cookie` request header value to send for `url`, if any.
    pub fn request_cookies(&self, url: &Url) -> Option<String> {
        let origin = url.origin().ascii_serialization();
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let is_https = url.scheme() == "https";

        let cookies = self.entries.get(&origin)?;

        let header = cookies
            .iter()
            .filter(|cookie| match &cookie.domain {
                Some(domain) => host == domain || host.ends_with(&format!(".{}", domain)),
                None => true,
            })
            .filter(|cookie| match &cookie.path {
                Some(cookie_path) => path.starts_with(cookie_path.as_str()),
                None => true,
            })
            .filter(|cookie| !cookie.secure || is_https)
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|bucket| bucket.is_empty())
    }
}

fn parse_set_cookie(header: &str) -> Option<Cookie> {
    let (name, rest) = header.split_once('=')?;

    let mut cookie = Cookie {
        name: name.trim().to_string(),
        value: String::new(),
        path: None,
        domain: None,
        secure: false,
        http_only: false,
        expires: None,
    };

    for (i, part) in rest.split(';').enumerate() {
        let part = part.trim();
        if i == 0 {
            cookie.value = part.to_string();
            continue;
        }

        if let Some((k, v)) = part.split_once('=') {
            match k.trim().to_ascii_lowercase().as_str() {
                "path" => cookie.path = Some(v.trim().to_string()),
                "domain" => cookie.domain = Some(v.trim().trim_start_matches('.').to_string()),
                "expires" => cookie.expires = Some(v.trim().to_string()),
                _ => {}
            }
        } else if part.eq_ignore_ascii_case("secure") {
            cookie.secure = true;
        } else if part.eq_ignore_ascii_case("httponly") {
            cookie.http_only = true;
        }
    }

    Some(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn stores_and_returns_cookie_for_same_origin() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("https://example.com/login"),
            ["session=abc123; Path=/; HttpOnly"].into_iter(),
        );

        assert_eq!(
            jar.request_cookies(&url("https://example.com/account")),
            Some("session=abc123".to_string())
        );
    }

    #[test]
    fn same_name_replaces_existing_cookie() {
        let mut jar = CookieJar::new();
        let u = url("https://example.com/");
        jar.store_response_cookies(&u, ["id=first; Path=/"].into_iter());
        jar.store_response_cookies(&u, ["id=second; Path=/"].into_iter());

        assert_eq!(jar.request_cookies(&u), Some("id=second".to_string()));
    }

    #[test]
    fn secure_cookie_not_sent_over_http() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("http://example.com/"),
            ["token=t; Path=/; Secure"].into_iter(),
        );

        assert_eq!(jar.request_cookies(&url("http://example.com/")), None);
    }

    #[test]
    fn path_scoping_is_prefix_based() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("https://example.com/api/v1/session"),
            ["scoped=yes; Path=/api"].into_iter(),
        );

        assert!(jar.request_cookies(&url("https://example.com/api/other")).is_some());
        assert!(jar.request_cookies(&url("https://example.com/web")).is_none());
    }

    #[test]
    fn different_origins_do_not_leak() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(&url("https://a.example.com/"), ["x=1; Path=/"].into_iter());
        assert!(jar.request_cookies(&url("https://b.example.com/")).is_none());
    }
}
