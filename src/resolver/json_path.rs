//! JSONPath evaluation against a parsed body.
//!
//! Supports the subset of the JSONPath grammar the path-expression feature
//! needs: an optional `$` root, dot members, bracket members (`['key']`,
//! `["key"]`), numeric indices (`[0]`) and the `*` wildcard (as a dot member
//! or inside brackets). Evaluation collects every match; the first match
//! wins when rendering the result.

use crate::models::{ResolveResult, ResolveWarning};
use serde_json::Value;

pub fn resolve(body: &str, path: &str) -> ResolveResult {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return ResolveResult::warning(ResolveWarning::IncorrectJsonPath),
    };

    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(()) => return ResolveResult::warning(ResolveWarning::InvalidJsonPath),
    };

    let mut matches: Vec<&Value> = vec![&parsed];
    for segment in &segments {
        let mut next = Vec::new();
        for value in matches {
            select(value, segment, &mut next);
        }
        matches = next;
        if matches.is_empty() {
            return ResolveResult::warning(ResolveWarning::IncorrectJsonPath);
        }
    }

    render(matches[0])
}

/// Strings are returned verbatim; every other value, `false`, `0` and `null`
/// included, is rendered as its textual JSON form.
fn render(value: &Value) -> ResolveResult {
    match value {
        Value::String(s) => ResolveResult::Success(s.clone()),
        other => ResolveResult::Success(other.to_string()),
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Member(String),
    Index(usize),
    Wildcard,
}

fn select<'a>(value: &'a Value, segment: &Segment, out: &mut Vec<&'a Value>) {
    match (segment, value) {
        (Segment::Member(name), Value::Object(map)) => {
            if let Some(found) = map.get(name) {
                out.push(found);
            }
        }
        (Segment::Index(index), Value::Array(items)) => {
            if let Some(found) = items.get(*index) {
                out.push(found);
            }
        }
        (Segment::Wildcard, Value::Object(map)) => out.extend(map.values()),
        (Segment::Wildcard, Value::Array(items)) => out.extend(items.iter()),
        _ => {}
    }
}

fn parse_path(path: &str) -> Result<Vec<Segment>, ()> {
    let mut rest = path.strip_prefix('$').unwrap_or(path);
    let mut segments = Vec::new();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            if after.is_empty() {
                return Err(());
            }
            rest = after;
            if rest.starts_with('[') {
                // "$.['key']" form; the bracket branch below consumes it.
                continue;
            }
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let (member, remainder) = rest.split_at(end);
            segments.push(member_segment(member)?);
            rest = remainder;
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or(())?;
            let inner = after[..end].trim();
            segments.push(bracket_segment(inner)?);
            rest = &after[end + 1..];
        } else if segments.is_empty() {
            // Leading member without an explicit root, e.g. "token.value".
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let (member, remainder) = rest.split_at(end);
            segments.push(member_segment(member)?);
            rest = remainder;
        } else {
            return Err(());
        }
    }

    Ok(segments)
}

fn member_segment(member: &str) -> Result<Segment, ()> {
    if member.is_empty() {
        return Err(());
    }
    if member == "*" {
        return Ok(Segment::Wildcard);
    }
    Ok(Segment::Member(member.to_string()))
}

fn bracket_segment(inner: &str) -> Result<Segment, ()> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Some(quoted) = strip_quotes(inner, '\'').or_else(|| strip_quotes(inner, '"')) {
        return Ok(Segment::Member(quoted.to_string()));
    }
    inner.parse::<usize>().map(Segment::Index).map_err(|_| ())
}

fn strip_quotes(s: &str, quote: char) -> Option<&str> {
    s.strip_prefix(quote)?.strip_suffix(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_member_chain_resolves_nested_value() {
        let body = r#"{"token":{"value":"abc123"}}"#;
        assert_eq!(
            resolve(body, "$.token.value"),
            ResolveResult::Success("abc123".to_string())
        );
        assert_eq!(
            resolve(body, "token.value"),
            ResolveResult::Success("abc123".to_string())
        );
    }

    #[test]
    fn falsy_values_resolve_successfully() {
        let body = r#"{"ok":false,"count":0,"text":"","gone":null}"#;
        assert_eq!(resolve(body, "$.ok"), ResolveResult::Success("false".to_string()));
        assert_eq!(resolve(body, "$.count"), ResolveResult::Success("0".to_string()));
        assert_eq!(resolve(body, "$.text"), ResolveResult::Success(String::new()));
        assert_eq!(resolve(body, "$.gone"), ResolveResult::Success("null".to_string()));
    }

    #[test]
    fn non_string_match_serializes_to_json_text() {
        let body = r#"{"items":[1,2,3]}"#;
        assert_eq!(
            resolve(body, "$.items"),
            ResolveResult::Success("[1,2,3]".to_string())
        );
    }

    #[test]
    fn bracket_and_index_forms() {
        let body = r#"{"odd key":[{"v":"x"},{"v":"y"}]}"#;
        assert_eq!(
            resolve(body, "$['odd key'][1].v"),
            ResolveResult::Success("y".to_string())
        );
        assert_eq!(
            resolve(body, r#"$["odd key"][0].v"#),
            ResolveResult::Success("x".to_string())
        );
    }

    #[test]
    fn wildcard_selects_first_child() {
        let body = r#"{"a":{"inner":1}}"#;
        assert_eq!(
            resolve(body, "$.a.*"),
            ResolveResult::Success("1".to_string())
        );
    }

    #[test]
    fn no_match_warns_incorrect_path() {
        let body = r#"{"token":"abc"}"#;
        assert_eq!(
            resolve(body, "$.missing"),
            ResolveResult::warning(ResolveWarning::IncorrectJsonPath)
        );
        assert_eq!(
            resolve(body, "$.token[0]"),
            ResolveResult::warning(ResolveWarning::IncorrectJsonPath)
        );
    }

    #[test]
    fn malformed_path_warns_invalid_path() {
        let body = r#"{"token":"abc"}"#;
        assert_eq!(
            resolve(body, "$."),
            ResolveResult::warning(ResolveWarning::InvalidJsonPath)
        );
        assert_eq!(
            resolve(body, "$.token["),
            ResolveResult::warning(ResolveWarning::InvalidJsonPath)
        );
    }

    #[test]
    fn unparsable_body_warns_incorrect_path() {
        assert_eq!(
            resolve("not json", "$.token"),
            ResolveResult::warning(ResolveWarning::IncorrectJsonPath)
        );
    }
}
