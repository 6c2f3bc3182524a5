//! Proxy routing decision and tunneling agent construction.

use crate::errors::EngineError;
use crate::models::RequestSettings;
use url::Url;

/// Returns true when the target host matches an exclusion entry.
///
/// Entries are lower-cased and deduplicated. An entry without a port matches
/// only when the target URL has no explicit port and the hostnames match
/// exactly; a `host:port` entry matches when the hostnames match and the
/// entry either omits the port or matches the target's port exactly.
pub fn ignore_proxy(target: &Url, exclude_hosts: &[String]) -> bool {
    if exclude_hosts.is_empty() {
        return false;
    }

    let Some(host_name) = target.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };
    let port = target.port();

    let mut entries: Vec<String> = exclude_hosts.iter().map(|e| e.to_ascii_lowercase()).collect();
    entries.sort();
    entries.dedup();

    for entry in entries {
        let mut parts = entry.splitn(2, ':');
        let entry_host = parts.next().unwrap_or("");
        let entry_port = parts.next();

        if entry_host != host_name {
            continue;
        }

        // A bare-host entry only covers targets without an explicit port; a
        // host:port entry covers the exact port and the portless form.
        let matches = match (entry_port, port) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => true,
            (Some(ep), Some(tp)) => ep == tp.to_string(),
        };
        if matches {
            return true;
        }
    }

    false
}

/// Builds the tunneling agents for a send, or an empty list when no proxy
/// applies: none configured, unsupported proxy scheme, or excluded host.
///
/// When a proxy is used, one agent handles `http:` targets and another
/// `https:` targets, both pointed at the same proxy endpoint.
pub fn proxies_for(target: &Url, settings: &RequestSettings) -> Result<Vec<reqwest::Proxy>, EngineError> {
    let Some(proxy) = &settings.proxy else {
        return Ok(Vec::new());
    };
    if ignore_proxy(target, &settings.exclude_hosts_for_proxy) {
        return Ok(Vec::new());
    }

    let Ok(endpoint) = Url::parse(proxy) else {
        return Ok(Vec::new());
    };
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Ok(Vec::new());
    }

    let host = endpoint.host_str().unwrap_or("");
    let port = endpoint
        .port()
        .unwrap_or(if endpoint.scheme() == "https" { 443 } else { 80 });
    let scheme = if settings.proxy_strict_ssl { "https" } else { "http" };
    let proxy_url = format!("{}://{}:{}", scheme, host, port);

    let http_agent = reqwest::Proxy::http(&proxy_url)
        .map_err(|e| EngineError::Config(format!("Invalid proxy endpoint {}: {}", proxy_url, e)))?;
    let https_agent = reqwest::Proxy::https(&proxy_url)
        .map_err(|e| EngineError::Config(format!("Invalid proxy endpoint {}: {}", proxy_url, e)))?;

    Ok(vec![http_agent, https_agent])
}
