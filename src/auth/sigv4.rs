//! AWS Signature Version 4 request signing.
//!
//! Signing happens immediately before transmission so the canonical request
//! is computed from exactly the method, host, path, query, headers and body
//! that go on the wire. The timestamp is injected by the caller, which keeps
//! signatures deterministic under test.

use crate::models::Headers;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Everything except RFC 3986 unreserved characters gets percent-encoded.
const AWS_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Credentials and scope parsed from an `AWS ...` authorization header.
///
/// Header grammar:
/// `AWS <accessKeyId> <secretAccessKey> [token:<tok>] [region:<r>] [service:<s>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: Option<String>,
    pub service: Option<String>,
}

impl AwsCredentials {
    /// Parses the full header value: positional key pair plus embedded
    /// `key:value` tokens.
    pub fn parse(authorization: &str) -> Self {
        let tokens: Vec<&str> = authorization.split_whitespace().collect();

        let tagged = |tag: &str| {
            tokens
                .iter()
                .find_map(|t| t.strip_prefix(tag))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            access_key_id: tokens.get(1).copied().unwrap_or("").to_string(),
            secret_access_key: tokens.get(2).copied().unwrap_or("").to_string(),
            session_token: tagged("token:"),
            region: tagged("region:"),
            service: tagged("service:"),
        }
    }

    /// Resolves signing scope: explicit header tokens win, then the
    /// `<service>.<region>.amazonaws.com` host shape, then the defaults
    /// `execute-api` / `us-east-1`.
    fn resolve_scope(&self, url: &Url) -> (String, String) {
        let mut service = self.service.clone();
        let mut region = self.region.clone();

        if service.is_none() || region.is_none() {
            if let Some(stripped) = url
                .host_str()
                .and_then(|h| h.strip_suffix(".amazonaws.com"))
            {
                let labels: Vec<&str> = stripped.split('.').collect();
                if labels.len() >= 2 {
                    service.get_or_insert_with(|| labels[labels.len() - 2].to_string());
                    region.get_or_insert_with(|| labels[labels.len() - 1].to_string());
                }
            }
        }

        (
            service.unwrap_or_else(|| "execute-api".to_string()),
            region.unwrap_or_else(|| "us-east-1".to_string()),
        )
    }
}

/// Signs the outgoing request in place.
///
/// Adds `host`, `x-amz-date` (and `x-amz-security-token` when a session
/// token is present), then replaces the `authorization` header with the
/// computed `AWS4-HMAC-SHA256` value. All headers present at call time are
/// included in the signature.
pub fn sign(
    method: &str,
    url: &Url,
    headers: &mut Headers,
    body: &[u8],
    credentials: &AwsCredentials,
    now: DateTime<Utc>,
) {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let (service, region) = credentials.resolve_scope(url);

    let host = match url.port() {
        Some(port) => format!("{}:{}", url.host_str().unwrap_or(""), port),
        None => url.host_str().unwrap_or("").to_string(),
    };
    headers.set("host", host);
    headers.set("x-amz-date", amz_date.clone());
    if let Some(token) = &credentials.session_token {
        headers.set("x-amz-security-token", token.clone());
    }
    headers.remove("authorization");

    // Canonical headers: lowercased names, trimmed values, sorted by name.
    let mut canonical: Vec<(String, String)> = headers
        .iter()
        .map(|(n, v)| (n.to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    canonical.sort();
    let canonical_headers: String = canonical
        .iter()
        .map(|(n, v)| format!("{}:{}\n", n, v))
        .collect();
    let signed_headers = canonical
        .iter()
        .map(|(n, _)| n.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_uri = if url.path().is_empty() { "/" } else { url.path() };
    let canonical_query = canonical_query_string(url);
    let payload_hash = hex(&Sha256::digest(body));

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        canonical_uri,
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, region, service);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac_sha256(
        format!("AWS4{}", credentials.secret_access_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex(&hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    headers.set(
        "authorization",
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id, credential_scope, signed_headers, signature
        ),
    );
}

/// Query pairs percent-encoded with the AWS character set and sorted by
/// encoded key, then encoded value.
fn canonical_query_string(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, AWS_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, AWS_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn credentials() -> AwsCredentials {
        AwsCredentials::parse(
            "AWS AKIDEXAMPLE wJalrXUtnFEMI region:us-east-1 service:execute-api",
        )
    }

    #[test]
    fn parse_reads_positional_and_tagged_tokens() {
        let creds = credentials();
        assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
        assert_eq!(creds.secret_access_key, "wJalrXUtnFEMI");
        assert_eq!(creds.session_token, None);
        assert_eq!(creds.region.as_deref(), Some("us-east-1"));
        assert_eq!(creds.service.as_deref(), Some("execute-api"));
    }

    #[test]
    fn scope_inferred_from_amazonaws_host() {
        let creds = AwsCredentials::parse("AWS key secret");
        let url = Url::parse("https://abc123.execute-api.eu-central-1.amazonaws.com/prod").unwrap();
        assert_eq!(
            creds.resolve_scope(&url),
            ("execute-api".to_string(), "eu-central-1".to_string())
        );
    }

    #[test]
    fn scope_falls_back_to_defaults() {
        let creds = AwsCredentials::parse("AWS key secret");
        let url = Url::parse("https://internal.example.com/x").unwrap();
        assert_eq!(
            creds.resolve_scope(&url),
            ("execute-api".to_string(), "us-east-1".to_string())
        );
    }

    #[test]
    fn sign_is_deterministic_for_fixed_time() {
        let url = Url::parse("https://api.example.amazonaws.com/items?b=2&a=1").unwrap();
        let creds = credentials();

        let mut first = Headers::from_pairs([("Content-Type", "application/json")]);
        let mut second = first.clone();
        sign("POST", &url, &mut first, b"{}", &creds, fixed_time());
        sign("POST", &url, &mut second, b"{}", &creds, fixed_time());

        assert_eq!(first.get("authorization"), second.get("authorization"));
    }

    #[test]
    fn sign_sets_date_host_and_authorization() {
        let url = Url::parse("https://api.example.amazonaws.com/items").unwrap();
        let mut headers = Headers::new();
        sign("GET", &url, &mut headers, b"", &credentials(), fixed_time());

        assert_eq!(headers.get("x-amz-date"), Some("20240501T120000Z"));
        assert_eq!(headers.get("host"), Some("api.example.amazonaws.com"));

        let authorization = headers.get("authorization").unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/execute-api/aws4_request"
        ));
        assert!(authorization.contains("SignedHeaders=host;x-amz-date"));
        let signature = authorization.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_token_adds_security_token_header() {
        let url = Url::parse("https://api.example.amazonaws.com/").unwrap();
        let creds = AwsCredentials::parse("AWS key secret token:SESSION region:us-west-2");
        let mut headers = Headers::new();
        sign("GET", &url, &mut headers, b"", &creds, fixed_time());

        assert_eq!(headers.get("x-amz-security-token"), Some("SESSION"));
        assert!(headers
            .get("authorization")
            .unwrap()
            .contains("x-amz-security-token"));
    }
}
