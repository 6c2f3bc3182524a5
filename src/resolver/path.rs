//! Reference grammar for captured-exchange path expressions.
//!
//! An expression names a captured exchange and drills into it:
//! `name[.request|response[.headers|body[.<subpath>]]]`. Each nesting level
//! is optional; the resolver reports progressively more specific warnings
//! the earlier the expression stops.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PATH_RE: Regex =
        Regex::new(r"^(\w+)(?:\.(request|response)(?:\.(body|headers)(?:\.(.*))?)?)?$")
            .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Headers,
    Body,
}

/// A parsed path expression. `entity`, `part` and `sub_path` nest: a later
/// field is only present when every earlier one is.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub name: String,
    pub entity: Option<Entity>,
    pub part: Option<Part>,
    pub sub_path: Option<String>,
}

/// Parses an expression against the grammar. `None` means the expression is
/// syntactically invalid.
pub fn parse(path: &str) -> Option<PathExpression> {
    let captures = PATH_RE.captures(path)?;

    let entity = captures.get(2).map(|m| match m.as_str() {
        "request" => Entity::Request,
        _ => Entity::Response,
    });
    let part = captures.get(3).map(|m| match m.as_str() {
        "headers" => Part::Headers,
        _ => Part::Body,
    });
    // A trailing dot captures an empty sub-path; treat it as absent.
    let sub_path = captures
        .get(4)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(PathExpression {
        name: captures[1].to_string(),
        entity,
        part,
        sub_path,
    })
}
