//! Media-type parsing helpers.
//!
//! Only the pieces the engine needs: the type/subtype essence, the `charset`
//! parameter, and the content-family predicates used by the response
//! normalizer and the body-path resolver.

/// A parsed media type, e.g. `application/json; charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub type_: String,
    pub subtype: String,
    pub charset: Option<String>,
}

impl MimeType {
    /// `type/subtype`, lowercased.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }
}

/// Parses a content-type string. Never fails: missing pieces come back empty.
pub fn parse(content_type: &str) -> MimeType {
    let mut parts = content_type.split(';').map(str::trim);
    let essence = parts.next().unwrap_or("");
    let charset = parts
        .find_map(|p| p.strip_prefix("charset="))
        .map(|c| c.trim_matches('"').to_string());

    let (type_, subtype) = match essence.split_once('/') {
        Some((t, s)) => (t, s),
        None => (essence, ""),
    };

    MimeType {
        type_: type_.to_ascii_lowercase(),
        subtype: subtype.to_ascii_lowercase(),
        charset,
    }
}

fn parsed(content_type: Option<&str>) -> Option<MimeType> {
    content_type.map(parse)
}

/// JSON family: `application/json`, `text/json`, `+json` suffixes and the
/// `x-amz-json` variants AWS services use.
pub fn is_json(content_type: Option<&str>) -> bool {
    let Some(mime) = parsed(content_type) else {
        return false;
    };
    let essence = mime.essence();
    essence == "application/json"
        || essence == "text/json"
        || mime.subtype.ends_with("+json")
        || mime.subtype.starts_with("x-amz-json")
}

pub fn is_xml(content_type: Option<&str>) -> bool {
    let Some(mime) = parsed(content_type) else {
        return false;
    };
    let essence = mime.essence();
    essence == "application/xml" || essence == "text/xml" || mime.subtype.ends_with("+xml")
}

pub fn is_javascript(content_type: Option<&str>) -> bool {
    matches!(
        parsed(content_type).map(|m| m.essence()),
        Some(e) if e == "application/javascript" || e == "text/javascript"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_essence_and_charset() {
        let mime = parse("Application/JSON; charset=UTF-8");
        assert_eq!(mime.essence(), "application/json");
        assert_eq!(mime.charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn parses_suffixed_subtype_without_charset() {
        let mime = parse("application/vnd.github.chitauri-preview+sha");
        assert_eq!(mime.essence(), "application/vnd.github.chitauri-preview+sha");
        assert_eq!(mime.charset, None);
    }

    #[test]
    fn json_family_detection() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("text/json; charset=utf-8")));
        assert!(is_json(Some("application/hal+json")));
        assert!(is_json(Some("application/x-amz-json-1.1")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(None));
    }

    #[test]
    fn xml_family_detection() {
        assert!(is_xml(Some("application/xml")));
        assert!(is_xml(Some("text/xml")));
        assert!(is_xml(Some("image/svg+xml")));
        assert!(!is_xml(Some("text/html")));
    }

    #[test]
    fn javascript_detection() {
        assert!(is_javascript(Some("application/javascript")));
        assert!(is_javascript(Some("text/javascript; charset=utf-8")));
        assert!(!is_javascript(Some("application/json")));
    }
}
