//! Per-send settings snapshot.
//!
//! A fresh snapshot is taken for every send; global configuration may change
//! between sends but never during one. The engine only reads these values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Client certificate material configured for one host.
///
/// Paths may be absolute or relative; relative paths are resolved against
/// the workspace root first, then against the directory of the active
/// request document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostCertificate {
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub pfx: Option<PathBuf>,
    pub passphrase: Option<String>,
}

/// Read-only settings bundle for a single send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    /// Whole-exchange timeout; applied only when greater than zero.
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    /// Maps 1:1 to transport certificate validation for the target.
    pub strict_ssl: bool,
    /// Attach the persistent cookie jar to this send.
    pub remember_cookies: bool,
    /// Proxy endpoint URL; ignored unless its scheme is http or https.
    pub proxy: Option<String>,
    pub proxy_strict_ssl: bool,
    /// Hosts (optionally `host:port`) that bypass the proxy.
    pub exclude_hosts_for_proxy: Vec<String>,
    /// Client certificates keyed by target host (`host` or `host:port`).
    pub host_certificates: HashMap<String, HostCertificate>,
    /// Replace `\uXXXX` escapes in decoded response bodies.
    pub decode_escaped_unicode: bool,
    /// Workspace root for resolving relative certificate paths.
    pub workspace_root: Option<PathBuf>,
    /// Directory of the active request document, second fallback for
    /// relative certificate paths.
    pub document_dir: Option<PathBuf>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            follow_redirects: true,
            strict_ssl: true,
            remember_cookies: false,
            proxy: None,
            proxy_strict_ssl: false,
            exclude_hosts_for_proxy: Vec::new(),
            host_certificates: HashMap::new(),
            decode_escaped_unicode: false,
            workspace_root: None,
            document_dir: None,
        }
    }
}
