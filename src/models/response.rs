//! Normalized HTTP response model.
//!
//! This is the value handed back to callers after a send completes (or the
//! best-effort partial value after a cancelled stream). It is immutable once
//! constructed and owned by the caller. The response embeds a copy of the
//! request as it was actually transmitted: final header casing, resolved
//! body, effective URL.

use crate::models::{Headers, HttpRequest};
use std::time::Duration;

/// Per-phase timing breakdown for one exchange.
///
/// Phases are named durations; `total` covers the whole exchange. The
/// transport records `wait` (request written until first byte of the
/// response) and `download` (first byte until the body settled).
#[derive(Debug, Clone, Default)]
pub struct Timings {
    phases: Vec<(String, Duration)>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: impl Into<String>, duration: Duration) {
        self.phases.push((phase.into(), duration));
    }

    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(name, _)| name == phase)
            .map(|(_, d)| *d)
    }

    pub fn phases(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.phases.iter().map(|(n, d)| (n.as_str(), *d))
    }
}

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Numeric status code (e.g. `200`).
    pub status_code: u16,
    /// Reason phrase; canonical for the code, `"Unknown"` for non-standard codes.
    pub status_text: String,
    /// Protocol version, e.g. `"1.1"` or `"2"`.
    pub http_version: String,
    /// Response headers with wire-observed name casing.
    pub headers: Headers,
    /// Body decoded using the `content-type` charset.
    pub body: String,
    /// Raw (decompressed) body bytes as received.
    pub raw_body: Vec<u8>,
    /// Size of the received body in bytes.
    pub body_size: usize,
    /// Approximate size of the received header block in bytes.
    pub headers_size: usize,
    pub timings: Timings,
    /// The request as actually transmitted.
    pub request: HttpRequest,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Status line plus headers plus body, used when a path expression stops
    /// at the whole-response level.
    pub fn to_display_string(&self) -> String {
        format!(
            "HTTP/{} {} {}\n{}\n\n{}",
            self.http_version,
            self.status_code,
            self.status_text,
            self.headers.to_display_string(),
            self.body
        )
    }
}
