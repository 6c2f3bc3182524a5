//! Buffered and streamed request execution.
//!
//! Lifecycle for a buffered send: `Idle → Sending → {Completed | Cancelled |
//! Failed}`. The streamed variant passes through `StreamConnecting` and
//! `StreamReceiving`, and a cancellation that lands after data was observed
//! settles as `Cancelled` carrying a best-effort partial response instead of
//! discarding the captured bytes.
//!
//! Exactly one attempt is made per send; the only internal re-issue is the
//! single Digest challenge response. Retry policy beyond that is an
//! external concern.

use crate::auth::{cognito, digest, sigv4, AuthScheme};
use crate::client::normalize;
use crate::client::options::{self, PreparedRequest};
use crate::cache::TokenCache;
use crate::cookies::FileCookieStore;
use crate::errors::EngineError;
use crate::models::{Headers, HttpRequest, HttpResponse, RequestBody, RequestSettings, Timings};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a send settled. Cancellation is a first-class outcome, not an error;
/// a cancelled stream that had already produced data carries the partial
/// response assembled from the received chunks.
#[derive(Debug)]
pub enum SendOutcome {
    Completed(HttpResponse),
    Cancelled { partial: Option<HttpResponse> },
}

/// Executes one send end to end: auth resolution, transport, normalization.
pub async fn execute(
    request: &HttpRequest,
    settings: &RequestSettings,
    cookie_store: Option<Arc<FileCookieStore>>,
    token_cache: &TokenCache,
) -> Result<SendOutcome, EngineError> {
    let mut prepared = options::prepare(request, settings)?;

    // Cognito signs in before any network call for the target resource; a
    // failure here fails the whole send.
    if let AuthScheme::Cognito(credentials) = prepared.scheme.clone() {
        let token = cognito::obtain_access_token(&credentials, token_cache).await?;
        prepared.headers.set("Authorization", format!("Bearer {}", token));
    }

    let cancel = request.begin_send();
    let client = options::build_client(&prepared, cookie_store)?;

    // Signing must see exactly what goes on the wire, so it runs last.
    if let AuthScheme::Aws(credentials) = prepared.scheme.clone() {
        let body = prepared.body.clone().unwrap_or_default();
        sigv4::sign(
            &prepared.method.clone(),
            &prepared.url.clone(),
            &mut prepared.headers,
            &body,
            &credentials,
            Utc::now(),
        );
    }

    if prepared.streaming {
        execute_streamed(&client, &prepared, request, settings, &cancel).await
    } else {
        execute_buffered(&client, &prepared, request, settings, &cancel).await
    }
}

async fn execute_buffered(
    client: &reqwest::Client,
    prepared: &PreparedRequest,
    request: &HttpRequest,
    settings: &RequestSettings,
    cancel: &CancellationToken,
) -> Result<SendOutcome, EngineError> {
    let started = Instant::now();

    let response = match send_once(client, prepared, &prepared.headers, cancel, settings).await? {
        Some(response) => response,
        None => return Ok(SendOutcome::Cancelled { partial: None }),
    };

    // One re-issue when the server answers a claimed Digest scheme with a
    // challenge; any further 401 is passed through to the caller.
    let response = if let AuthScheme::Digest { username, password } = &prepared.scheme {
        match digest_retry(client, prepared, username, password, &response, cancel, settings).await? {
            DigestStep::Retried(second) => second,
            DigestStep::NotApplicable => response,
            DigestStep::CancelledDuringRetry => {
                return Ok(SendOutcome::Cancelled { partial: None })
            }
        }
    } else {
        response
    };

    let wait = started.elapsed();
    let status = response.status();
    let version = http_version_string(response.version());
    let headers = Headers::from_header_map(response.headers());
    let headers_size = header_block_size(&version, status, &headers);

    let raw_body = tokio::select! {
        _ = cancel.cancelled() => return Ok(SendOutcome::Cancelled { partial: None }),
        body = response.bytes() => {
            body.map_err(|e| classify_transport_error(&e, settings))?.to_vec()
        }
    };

    let mut timings = Timings::new();
    timings.record("wait", wait);
    timings.record("download", started.elapsed() - wait);
    timings.record("total", started.elapsed());

    Ok(SendOutcome::Completed(assemble_response(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown").to_string(),
        version,
        headers,
        headers_size,
        raw_body,
        timings,
        prepared,
        request,
        settings,
    )))
}

async fn execute_streamed(
    client: &reqwest::Client,
    prepared: &PreparedRequest,
    request: &HttpRequest,
    settings: &RequestSettings,
    cancel: &CancellationToken,
) -> Result<SendOutcome, EngineError> {
    let started = Instant::now();

    // StreamConnecting: no partial exists until a response event arrives.
    let response = match send_once(client, prepared, &prepared.headers, cancel, settings).await? {
        Some(response) => response,
        None => return Ok(SendOutcome::Cancelled { partial: None }),
    };

    // A Digest challenge arrives as an ordinary 401 before any streaming
    // starts; answer it the same way the buffered path does.
    let response = if let AuthScheme::Digest { username, password } = &prepared.scheme {
        match digest_retry(client, prepared, username, password, &response, cancel, settings).await? {
            DigestStep::Retried(second) => second,
            DigestStep::NotApplicable => response,
            DigestStep::CancelledDuringRetry => {
                return Ok(SendOutcome::Cancelled { partial: None })
            }
        }
    } else {
        response
    };

    // First response event: capture status, version, headers and timing.
    let wait = started.elapsed();
    let status = response.status();
    let version = http_version_string(response.version());
    let headers = Headers::from_header_map(response.headers());
    let headers_size = header_block_size(&version, status, &headers);

    let mut chunks: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();

    // StreamReceiving: accumulate until the server ends the stream, the
    // caller cancels, or the connection drops.
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let partial = assemble_response(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown").to_string(),
                    version,
                    headers,
                    headers_size,
                    chunks,
                    partial_timings(started, wait),
                    prepared,
                    request,
                    settings,
                );
                return Ok(SendOutcome::Cancelled { partial: Some(partial) });
            }
            next = stream.next() => match next {
                Some(Ok(chunk)) => chunks.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    // A destroyed connection after an explicit cancel still
                    // yields the data observed so far.
                    if request.is_cancelled() {
                        let partial = assemble_response(
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown").to_string(),
                            version,
                            headers,
                            headers_size,
                            chunks,
                            partial_timings(started, wait),
                            prepared,
                            request,
                            settings,
                        );
                        return Ok(SendOutcome::Cancelled { partial: Some(partial) });
                    }
                    return Err(classify_transport_error(&e, settings));
                }
                None => break,
            }
        }
    }

    let mut timings = Timings::new();
    timings.record("wait", wait);
    timings.record("download", started.elapsed() - wait);
    timings.record("total", started.elapsed());

    Ok(SendOutcome::Completed(assemble_response(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown").to_string(),
        version,
        headers,
        headers_size,
        chunks,
        timings,
        prepared,
        request,
        settings,
    )))
}

enum DigestStep {
    NotApplicable,
    Retried(reqwest::Response),
    CancelledDuringRetry,
}

async fn digest_retry(
    client: &reqwest::Client,
    prepared: &PreparedRequest,
    username: &str,
    password: &str,
    response: &reqwest::Response,
    cancel: &CancellationToken,
    settings: &RequestSettings,
) -> Result<DigestStep, EngineError> {
    if response.status() != reqwest::StatusCode::UNAUTHORIZED {
        return Ok(DigestStep::NotApplicable);
    }
    let Some(challenge) = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .and_then(digest::parse_challenge)
    else {
        return Ok(DigestStep::NotApplicable);
    };

    let uri = match prepared.url.query() {
        Some(query) => format!("{}?{}", prepared.url.path(), query),
        None => prepared.url.path().to_string(),
    };
    let Some(authorization) =
        digest::answer_challenge(username, password, &prepared.method, &uri, &challenge)
    else {
        return Ok(DigestStep::NotApplicable);
    };

    let mut headers = prepared.headers.clone();
    headers.set("Authorization", authorization);

    match send_once(client, prepared, &headers, cancel, settings).await? {
        Some(second) => Ok(DigestStep::Retried(second)),
        None => Ok(DigestStep::CancelledDuringRetry),
    }
}

/// Issues one request. `Ok(None)` means the send was cancelled before a
/// response event arrived.
async fn send_once(
    client: &reqwest::Client,
    prepared: &PreparedRequest,
    headers: &Headers,
    cancel: &CancellationToken,
    settings: &RequestSettings,
) -> Result<Option<reqwest::Response>, EngineError> {
    let method = reqwest::Method::from_bytes(prepared.method.as_bytes())
        .map_err(|_| EngineError::Config(format!("Invalid HTTP method: {}", prepared.method)))?;

    let mut builder = client
        .request(method, prepared.url.clone())
        .headers(headers.to_header_map());
    if let Some(body) = &prepared.body {
        builder = builder.body(body.clone());
    }

    tokio::select! {
        _ = cancel.cancelled() => Ok(None),
        result = builder.send() => result
            .map(Some)
            .map_err(|e| classify_transport_error(&e, settings)),
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble_response(
    status_code: u16,
    status_text: String,
    http_version: String,
    headers: Headers,
    headers_size: usize,
    raw_body: Vec<u8>,
    timings: Timings,
    prepared: &PreparedRequest,
    request: &HttpRequest,
    settings: &RequestSettings,
) -> HttpResponse {
    let content_type = headers.get("content-type").map(str::to_string);
    let body = normalize::decode_body(
        &raw_body,
        content_type.as_deref(),
        settings.decode_escaped_unicode,
    );

    // Wire headers arrive lowercased from the HTTP layer; restore whatever
    // raw casing is available (identity for responses, the caller's casing
    // for the request echo).
    let raw_names: Vec<String> = headers.names().map(str::to_string).collect();
    let headers = normalize::canonicalize_header_names(&headers, raw_names.iter().map(String::as_str));

    let echo_headers =
        normalize::canonicalize_header_names(&prepared.headers, request.headers.names());
    let echo_body = prepared.body.as_ref().map(|bytes| match &request.body {
        Some(RequestBody::Text(_)) | None => {
            RequestBody::Text(String::from_utf8_lossy(bytes).into_owned())
        }
        Some(RequestBody::Binary(_)) => RequestBody::Binary(bytes.clone()),
    });
    let echo = HttpRequest::new(
        prepared.method.clone(),
        prepared.url.to_string(),
        echo_headers,
        echo_body,
        request.name.clone(),
    );

    HttpResponse {
        status_code,
        status_text,
        http_version,
        headers,
        body,
        body_size: raw_body.len(),
        raw_body,
        headers_size,
        timings,
        request: echo,
    }
}

fn partial_timings(started: Instant, wait: std::time::Duration) -> Timings {
    let mut timings = Timings::new();
    timings.record("wait", wait);
    timings.record("total", started.elapsed());
    timings
}

fn http_version_string(version: reqwest::Version) -> String {
    match version {
        reqwest::Version::HTTP_09 => "0.9".to_string(),
        reqwest::Version::HTTP_10 => "1.0".to_string(),
        reqwest::Version::HTTP_11 => "1.1".to_string(),
        reqwest::Version::HTTP_2 => "2".to_string(),
        reqwest::Version::HTTP_3 => "3".to_string(),
        other => format!("{:?}", other),
    }
}

/// Approximate on-wire size of the status line plus header block.
fn header_block_size(version: &str, status: reqwest::StatusCode, headers: &Headers) -> usize {
    let status_line = format!(
        "HTTP/{} {} {}\r\n",
        version,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    let header_lines: usize = headers
        .iter()
        .map(|(name, value)| name.len() + 2 + value.len() + 2)
        .sum();
    status_line.len() + header_lines + 2
}

/// Maps connection-level failures to the human-readable classification the
/// caller surfaces. Never triggers a retry.
fn classify_transport_error(error: &reqwest::Error, settings: &RequestSettings) -> EngineError {
    let details = error.to_string();
    let chain = error_chain(error).to_ascii_lowercase();

    let message = if error.is_timeout() {
        format!(
            "Request timed out. Double-check your network connection and/or raise the timeout \
             duration (currently set to {}ms) as needed. Details: {}.",
            settings.timeout_ms, details
        )
    } else if chain.contains("refused") {
        format!(
            "The connection was rejected. Either the requested service isn't running on the \
             requested server/port, the proxy settings are misconfigured, or a firewall is \
             blocking requests. Details: {}.",
            details
        )
    } else if chain.contains("unreachable") {
        format!("You don't seem to be connected to a network. Details: {}", details)
    } else {
        details
    };

    EngineError::Transport(message)
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}
