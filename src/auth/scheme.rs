//! `Authorization` header classification.

use crate::auth::{CognitoCredentials, AwsCredentials};
use crate::models::Headers;

/// The closed set of authentication schemes the engine can drive.
///
/// At most one scheme is active per request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthScheme {
    /// No scheme claimed the header (including unrecognized schemes, whose
    /// header stays on the request untouched).
    None,
    /// RFC 7617 credentials; the transport base64-encodes them.
    Basic { username: String, password: String },
    /// RFC 2617 challenge-response, driven by a single post-receive retry.
    Digest { username: String, password: String },
    /// AWS SigV4 request signing, applied immediately before transmission.
    Aws(AwsCredentials),
    /// Cognito user-pool sign-in performed before the main request; the
    /// obtained access token is injected as a bearer.
    Cognito(CognitoCredentials),
}

/// Inspects and possibly claims the `Authorization` header.
///
/// Classification is case-insensitive on the scheme token. Two Basic
/// grammars are accepted for compatibility: `Basic user pass`
/// (space-separated, the password may itself contain spaces) and the
/// single-token `Basic user:pass` form.
pub fn classify(headers: &mut Headers) -> AuthScheme {
    let Some(authorization) = headers.get("authorization").map(str::to_string) else {
        return AuthScheme::None;
    };

    let tokens: Vec<&str> = authorization.split_whitespace().collect();
    let scheme = tokens.first().copied().unwrap_or("").to_ascii_lowercase();
    let user = tokens.get(1).copied().unwrap_or("");

    if tokens.len() > 2 {
        let pass = tokens[2..].join(" ");
        match scheme.as_str() {
            "basic" => {
                headers.remove("authorization");
                return AuthScheme::Basic {
                    username: user.to_string(),
                    password: pass,
                };
            }
            "digest" => {
                headers.remove("authorization");
                return AuthScheme::Digest {
                    username: user.to_string(),
                    password: pass,
                };
            }
            "aws" => {
                headers.remove("authorization");
                return AuthScheme::Aws(AwsCredentials::parse(&authorization));
            }
            "cognito" => {
                headers.remove("authorization");
                return AuthScheme::Cognito(CognitoCredentials::parse(&authorization));
            }
            _ => return AuthScheme::None,
        }
    }

    // Single credential token: only `Basic user:pass` is special-cased.
    // The password is the segment between the first two colons; anything
    // after a second colon is discarded.
    if scheme == "basic" && user.contains(':') {
        headers.remove("authorization");
        let mut segments = user.split(':');
        let username = segments.next().unwrap_or("");
        let password = segments.next().unwrap_or("");
        return AuthScheme::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
    }

    AuthScheme::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(authorization: &str) -> Headers {
        Headers::from_pairs([("Authorization", authorization)])
    }

    #[test]
    fn basic_space_separated_claims_header() {
        let mut headers = headers_with("Basic alice s3cret");
        let scheme = classify(&mut headers);

        assert_eq!(
            scheme,
            AuthScheme::Basic {
                username: "alice".to_string(),
                password: "s3cret".to_string()
            }
        );
        assert!(!headers.contains("authorization"));
    }

    #[test]
    fn basic_password_may_contain_spaces() {
        let mut headers = headers_with("basic alice pass with spaces");
        let scheme = classify(&mut headers);

        assert_eq!(
            scheme,
            AuthScheme::Basic {
                username: "alice".to_string(),
                password: "pass with spaces".to_string()
            }
        );
    }

    #[test]
    fn basic_colon_form_claims_header() {
        let mut headers = headers_with("Basic alice:s3cret");
        let scheme = classify(&mut headers);

        assert_eq!(
            scheme,
            AuthScheme::Basic {
                username: "alice".to_string(),
                password: "s3cret".to_string()
            }
        );
        assert!(!headers.contains("authorization"));
    }

    #[test]
    fn basic_colon_form_keeps_only_the_second_segment_as_password() {
        let mut headers = headers_with("Basic alice:s3cret:extra");
        let scheme = classify(&mut headers);

        assert_eq!(
            scheme,
            AuthScheme::Basic {
                username: "alice".to_string(),
                password: "s3cret".to_string()
            }
        );
    }

    #[test]
    fn bearer_passes_through_untouched() {
        let mut headers = headers_with("Bearer abcdef");
        assert_eq!(classify(&mut headers), AuthScheme::None);
        assert_eq!(headers.get("authorization"), Some("Bearer abcdef"));
    }

    #[test]
    fn basic_single_token_without_colon_passes_through() {
        let mut headers = headers_with("Basic onlyuser");
        assert_eq!(classify(&mut headers), AuthScheme::None);
        assert!(headers.contains("authorization"));
    }

    #[test]
    fn digest_is_case_insensitive() {
        let mut headers = headers_with("DIGEST bob hunter2");
        let scheme = classify(&mut headers);
        assert_eq!(
            scheme,
            AuthScheme::Digest {
                username: "bob".to_string(),
                password: "hunter2".to_string()
            }
        );
    }

    #[test]
    fn aws_scheme_parses_embedded_tokens() {
        let mut headers =
            headers_with("AWS AKIAEXAMPLE secretkey token:tok region:eu-west-1 service:s3");
        let AuthScheme::Aws(creds) = classify(&mut headers) else {
            panic!("expected aws scheme");
        };

        assert_eq!(creds.access_key_id, "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key, "secretkey");
        assert_eq!(creds.session_token.as_deref(), Some("tok"));
        assert_eq!(creds.region.as_deref(), Some("eu-west-1"));
        assert_eq!(creds.service.as_deref(), Some("s3"));
        assert!(!headers.contains("authorization"));
    }

    #[test]
    fn cognito_scheme_parses_positionally() {
        let mut headers = headers_with("Cognito carol pw us-east-1 pool-id client-id");
        let AuthScheme::Cognito(creds) = classify(&mut headers) else {
            panic!("expected cognito scheme");
        };

        assert_eq!(creds.username, "carol");
        assert_eq!(creds.password, "pw");
        assert_eq!(creds.region, "us-east-1");
        assert_eq!(creds.user_pool_id, "pool-id");
        assert_eq!(creds.client_id, "client-id");
    }

    #[test]
    fn no_header_classifies_as_none() {
        let mut headers = Headers::new();
        assert_eq!(classify(&mut headers), AuthScheme::None);
    }
}
