//! Client certificate resolution.
//!
//! Maps a request's host to an optional TLS identity configured in the
//! per-host certificate table. Paths may be absolute or relative; relative
//! paths are resolved against the workspace root first, then against the
//! directory of the active request document. A missing file is a non-fatal
//! warning and that credential file contributes nothing.

use crate::models::{HostCertificate, RequestSettings};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Resolves the client identity for `target`, if one is configured.
///
/// The lookup key is the URL host, with the port appended (`host:port`)
/// when the URL carries an explicit port.
pub fn resolve_identity(target: &Url, settings: &RequestSettings) -> Option<reqwest::Identity> {
    let host = target.host_str()?;
    let key = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let certificate = settings
        .host_certificates
        .get(&key)
        .or_else(|| settings.host_certificates.get(host))?;

    build_identity(certificate, settings)
}

fn build_identity(
    certificate: &HostCertificate,
    settings: &RequestSettings,
) -> Option<reqwest::Identity> {
    let cert = certificate
        .cert
        .as_deref()
        .and_then(|p| read_certificate_file(p, settings));
    let key = certificate
        .key
        .as_deref()
        .and_then(|p| read_certificate_file(p, settings));
    let pfx = certificate
        .pfx
        .as_deref()
        .and_then(|p| read_certificate_file(p, settings));

    // The rustls backend consumes PEM identities; pfx bundles would need
    // the native TLS backend. Surface that instead of failing the send.
    if pfx.is_some() {
        log::warn!(
            "pfx certificates are not supported by the rustls TLS backend; convert the bundle to PEM cert/key files"
        );
    }
    if certificate.passphrase.is_some() {
        log::warn!(
            "certificate passphrases are not supported; provide an unencrypted PEM key"
        );
    }

    let (cert, key) = (cert?, key?);
    let mut pem = cert;
    pem.extend_from_slice(b"\n");
    pem.extend_from_slice(&key);

    match reqwest::Identity::from_pem(&pem) {
        Ok(identity) => Some(identity),
        Err(e) => {
            log::warn!("Failed to load client certificate: {}", e);
            None
        }
    }
}

/// Reads one credential file, trying the configured path absolutely, then
/// relative to the workspace root, then relative to the request document.
fn read_certificate_file(path: &Path, settings: &RequestSettings) -> Option<Vec<u8>> {
    if path.is_absolute() {
        return read_existing(path);
    }

    for base in [&settings.workspace_root, &settings.document_dir]
        .into_iter()
        .flatten()
    {
        let candidate: PathBuf = base.join(path);
        if candidate.exists() {
            return fs::read(&candidate).ok();
        }
    }

    log::warn!(
        "Certificate path {} doesn't exist, please make sure it exists",
        path.display()
    );
    None
}

fn read_existing(path: &Path) -> Option<Vec<u8>> {
    if path.exists() {
        fs::read(path).ok()
    } else {
        log::warn!(
            "Certificate path {} doesn't exist, please make sure it exists",
            path.display()
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn host_without_certificate_yields_none() {
        let settings = RequestSettings::default();
        let url = Url::parse("https://example.com/").unwrap();
        assert!(resolve_identity(&url, &settings).is_none());
    }

    #[test]
    fn missing_file_is_non_fatal() {
        let mut host_certificates = HashMap::new();
        host_certificates.insert(
            "example.com".to_string(),
            HostCertificate {
                cert: Some(PathBuf::from("/nonexistent/client.pem")),
                key: Some(PathBuf::from("/nonexistent/client.key")),
                ..Default::default()
            },
        );
        let settings = RequestSettings {
            host_certificates,
            ..Default::default()
        };

        let url = Url::parse("https://example.com/").unwrap();
        assert!(resolve_identity(&url, &settings).is_none());
    }

    #[test]
    fn relative_path_resolves_against_workspace_root_first() {
        let workspace = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join("client.pem"), "workspace copy").unwrap();
        fs::write(docs.path().join("client.pem"), "document copy").unwrap();

        let settings = RequestSettings {
            workspace_root: Some(workspace.path().to_path_buf()),
            document_dir: Some(docs.path().to_path_buf()),
            ..Default::default()
        };

        let bytes = read_certificate_file(Path::new("client.pem"), &settings).unwrap();
        assert_eq!(bytes, b"workspace copy");
    }

    #[test]
    fn relative_path_falls_back_to_document_dir() {
        let docs = tempfile::tempdir().unwrap();
        fs::write(docs.path().join("only-here.pem"), "document copy").unwrap();

        let settings = RequestSettings {
            workspace_root: Some(PathBuf::from("/nonexistent-root")),
            document_dir: Some(docs.path().to_path_buf()),
            ..Default::default()
        };

        let bytes = read_certificate_file(Path::new("only-here.pem"), &settings).unwrap();
        assert_eq!(bytes, b"document copy");
    }

    #[test]
    fn passphrase_entry_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("client.pem"), "not a real cert").unwrap();
        fs::write(dir.path().join("client.key"), "not a real key").unwrap();

        let mut host_certificates = HashMap::new();
        host_certificates.insert(
            "example.com".to_string(),
            HostCertificate {
                cert: Some(dir.path().join("client.pem")),
                key: Some(dir.path().join("client.key")),
                passphrase: Some("secret".to_string()),
                ..Default::default()
            },
        );
        let settings = RequestSettings {
            host_certificates,
            ..Default::default()
        };

        // The passphrase is warned about and ignored; the malformed PEM
        // then fails to load, omitting the credential without an error.
        let url = Url::parse("https://example.com/").unwrap();
        assert!(resolve_identity(&url, &settings).is_none());
    }

    #[test]
    fn port_qualified_table_entry_wins_over_bare_host() {
        let mut host_certificates = HashMap::new();
        host_certificates.insert("example.com:8443".to_string(), HostCertificate::default());
        let settings = RequestSettings {
            host_certificates,
            ..Default::default()
        };

        // Entry found but contains no credential files: still resolves to no
        // identity, exercising the host:port lookup path.
        let url = Url::parse("https://example.com:8443/").unwrap();
        assert!(resolve_identity(&url, &settings).is_none());
    }
}
