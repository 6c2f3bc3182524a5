//! RFC 2617 Digest access authentication.
//!
//! The transport performs the first exchange without credentials; when the
//! server answers 401 with a `WWW-Authenticate: Digest` challenge, the
//! response is computed here and the request is re-issued exactly once with
//! the resulting `Authorization` header.

use md5::{Digest as _, Md5};
use rand::Rng;
use std::collections::HashMap;

/// Parses a `WWW-Authenticate` value into its challenge parameters.
///
/// Returns `None` unless the scheme token is `Digest`. Quoted values are
/// unquoted; parameter names are lowercased.
pub fn parse_challenge(header: &str) -> Option<HashMap<String, String>> {
    let rest = header.trim().strip_prefix_ignore_case("digest")?;

    let mut params = HashMap::new();
    for part in split_challenge_params(rest) {
        if let Some((name, value)) = part.split_once('=') {
            params.insert(
                name.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }
    Some(params)
}

/// Splits challenge parameters on commas while respecting quoted strings.
fn split_challenge_params(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Computes the `Authorization` header value answering `challenge`.
///
/// `uri` is the request path plus query as sent on the wire. Supports the
/// `qop=auth` and qop-less response forms; `auth-int` is not attempted.
/// Returns `None` when the challenge lacks a nonce.
pub fn answer_challenge(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    challenge: &HashMap<String, String>,
) -> Option<String> {
    let realm = challenge.get("realm").map(String::as_str).unwrap_or("");
    let nonce = challenge.get("nonce")?;
    let qop_offered = challenge
        .get("qop")
        .map(|q| q.split(',').any(|t| t.trim() == "auth"))
        .unwrap_or(false);

    let ha1 = md5_hex(&format!("{}:{}:{}", username, realm, password));
    let ha2 = md5_hex(&format!("{}:{}", method.to_ascii_uppercase(), uri));

    let mut fields = vec![
        format!("username=\"{}\"", username),
        format!("realm=\"{}\"", realm),
        format!("nonce=\"{}\"", nonce),
        format!("uri=\"{}\"", uri),
    ];

    let response = if qop_offered {
        let nc = "00000001";
        let cnonce = random_cnonce();
        let response = md5_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, nonce, nc, cnonce, ha2));
        fields.push("qop=auth".to_string());
        fields.push(format!("nc={}", nc));
        fields.push(format!("cnonce=\"{}\"", cnonce));
        response
    } else {
        md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2))
    };
    fields.push(format!("response=\"{}\"", response));

    if let Some(opaque) = challenge.get("opaque") {
        fields.push(format!("opaque=\"{}\"", opaque));
    }
    if let Some(algorithm) = challenge.get("algorithm") {
        fields.push(format!("algorithm={}", algorithm));
    }

    Some(format!("Digest {}", fields.join(", ")))
}

fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn random_cnonce() -> String {
    let mut rng = rand::rng();
    (0..16)
        .map(|_| format!("{:x}", rng.random_range(0..16)))
        .collect()
}

trait StripPrefixIgnoreCase {
    fn strip_prefix_ignore_case<'a>(&'a self, prefix: &str) -> Option<&'a str>;
}

impl StripPrefixIgnoreCase for str {
    fn strip_prefix_ignore_case<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        if self.len() >= prefix.len() && self[..prefix.len()].eq_ignore_ascii_case(prefix) {
            Some(&self[prefix.len()..])
        } else {
            None
        }
    }
}
