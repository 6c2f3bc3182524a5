//! Response normalization: charset decoding, optional unicode-escape
//! replacement, and header-name canonicalization.

use crate::mime;
use crate::models::Headers;
use encoding_rs::{Encoding, UTF_8};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref UNICODE_ESCAPE: Regex =
        Regex::new(r"\\u([0-9a-fA-F]{4})").expect("unicode escape pattern is valid");
}

/// Picks the encoding named by the `charset` parameter of `content_type`.
///
/// Unknown or unsupported charset labels fall back to UTF-8 (which decodes
/// 8-bit-safe with replacement characters).
pub fn resolve_encoding(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .map(mime::parse)
        .and_then(|m| m.charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decodes `raw` using the content-type charset, optionally replacing
/// `\uXXXX` escape sequences afterwards.
pub fn decode_body(raw: &[u8], content_type: Option<&str>, decode_escaped_unicode: bool) -> String {
    let encoding = resolve_encoding(content_type);
    let (decoded, _, _) = encoding.decode(raw);
    let body = decoded.into_owned();

    if decode_escaped_unicode {
        decode_escaped_unicode_characters(&body)
    } else {
        body
    }
}

/// Replaces `\uXXXX` escapes by the literal character.
///
/// A literal quote stays backslash-escaped so embedded JSON string
/// delimiters survive; this is a textual transform, not a JSON reparse.
/// Escapes naming surrogate code points are left untouched.
pub fn decode_escaped_unicode_characters(body: &str) -> String {
    UNICODE_ESCAPE
        .replace_all(body, |caps: &Captures| {
            let code = u32::from_str_radix(&caps[1], 16).unwrap_or(0);
            match char::from_u32(code) {
                Some('"') => "\\\"".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Restores header-name casing from `raw_names`.
///
/// Builds a case-insensitive lookup table from the raw names (first
/// occurrence wins) and rewrites each header name to the raw casing when a
/// match exists; unmatched names are kept as-is.
pub fn canonicalize_header_names<'a>(
    headers: &Headers,
    raw_names: impl Iterator<Item = &'a str>,
) -> Headers {
    let mut casing: HashMap<String, &str> = HashMap::new();
    for name in raw_names {
        casing.entry(name.to_ascii_lowercase()).or_insert(name);
    }

    Headers::from_pairs(headers.iter().map(|(name, value)| {
        let adjusted = casing
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(name);
        (adjusted.to_string(), value.to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parameter_selects_encoding() {
        assert_eq!(resolve_encoding(Some("text/plain; charset=iso-8859-1")).name(), "windows-1252");
        assert_eq!(resolve_encoding(Some("application/json; charset=utf-8")).name(), "UTF-8");
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        assert_eq!(resolve_encoding(Some("text/plain; charset=no-such-charset")).name(), "UTF-8");
        assert_eq!(resolve_encoding(None).name(), "UTF-8");
    }

    #[test]
    fn latin1_bytes_decode_with_declared_charset() {
        // 0xE9 is é in ISO-8859-1.
        let body = decode_body(&[0x63, 0x61, 0x66, 0xE9], Some("text/plain; charset=iso-8859-1"), false);
        assert_eq!(body, "café");
    }

    #[test]
    fn unicode_escapes_are_replaced() {
        assert_eq!(decode_escaped_unicode_characters(r"A\u00e9\u4f60"), "Aé你");
    }

    #[test]
    fn escaped_quote_stays_backslash_escaped() {
        assert_eq!(
            decode_escaped_unicode_characters(r#"{"text":"say \u0022hi\u0022"}"#),
            r#"{"text":"say \"hi\""}"#
        );
    }

    #[test]
    fn surrogate_escape_is_left_untouched() {
        assert_eq!(decode_escaped_unicode_characters(r"\ud83d"), r"\ud83d");
    }

    #[test]
    fn header_casing_restored_from_raw_names_first_wins() {
        let headers = Headers::from_pairs([("content-type", "text/plain"), ("x-custom", "1")]);
        let raw = ["Content-Type", "CONTENT-TYPE", "X-Custom"];
        let adjusted = canonicalize_header_names(&headers, raw.into_iter());

        let names: Vec<&str> = adjusted.names().collect();
        assert_eq!(names, vec!["Content-Type", "X-Custom"]);
    }

    #[test]
    fn unmatched_names_keep_their_casing() {
        let headers = Headers::from_pairs([("x-unlisted", "v")]);
        let adjusted = canonicalize_header_names(&headers, ["Content-Type"].into_iter());
        assert_eq!(adjusted.names().collect::<Vec<_>>(), vec!["x-unlisted"]);
    }
}
