//! Path-expression resolution against captured exchanges.
//!
//! A named, completed exchange can be referenced from later requests with a
//! dotted expression such as `login.response.body.$.token`. Resolution is
//! total: every outcome is a [`ResolveResult`], never a panic and never an
//! `Err` on the function signature. Expressions that stop early still yield
//! the closest enclosing value as a warning so a caller can show something
//! useful.

pub mod json_path;
pub mod path;
pub mod xml_path;

use crate::mime;
use crate::models::{Headers, HttpResponse, ResolveError, ResolveResult, ResolveWarning};
use path::{Entity, Part};

const FORCE_JSON_PREFIX: &str = "asJson.";
const FORCE_XML_PREFIX: &str = "asXml.";

/// Resolves `path_expression` against a captured response, or `None` when no
/// exchange with that name has completed.
pub fn resolve(value: Option<&HttpResponse>, path_expression: &str) -> ResolveResult {
    let (Some(response), false) = (value, path_expression.is_empty()) else {
        return ResolveResult::Error(ResolveError::NoRequestVariablePath);
    };

    let Some(expression) = path::parse(path_expression) else {
        return ResolveResult::Error(ResolveError::InvalidRequestVariableReference);
    };

    let Some(entity) = expression.entity else {
        return ResolveResult::warning_with(
            response.to_display_string(),
            ResolveWarning::MissingRequestEntityName,
        );
    };

    // The request side is the echoed request as actually transmitted.
    let (headers, body, body_missing_warning, entity_display) = match entity {
        Entity::Request => (
            &response.request.headers,
            response.request.body.as_ref().map(|b| b.as_text()),
            ResolveWarning::RequestBodyNotExist,
            response.request.to_display_string(),
        ),
        Entity::Response => (
            &response.headers,
            Some(response.body.clone()),
            ResolveWarning::ResponseBodyNotExist,
            response.to_display_string(),
        ),
    };

    let Some(part) = expression.part else {
        return ResolveResult::warning_with(
            entity_display,
            ResolveWarning::MissingRequestEntityPart,
        );
    };

    match part {
        Part::Headers => resolve_headers(headers, expression.sub_path.as_deref()),
        Part::Body => resolve_body(
            headers,
            body,
            body_missing_warning,
            expression.sub_path.as_deref(),
        ),
    }
}

fn resolve_headers(headers: &Headers, name: Option<&str>) -> ResolveResult {
    let Some(name) = name else {
        return ResolveResult::warning_with(
            headers.to_display_string(),
            ResolveWarning::MissingHeaderName,
        );
    };

    // An existing header with an empty value is a hit, not a miss.
    match headers.get(name) {
        Some(value) => ResolveResult::Success(value.to_string()),
        None => ResolveResult::warning(ResolveWarning::IncorrectHeaderName),
    }
}

fn resolve_body(
    headers: &Headers,
    body: Option<String>,
    missing_warning: ResolveWarning,
    sub_path: Option<&str>,
) -> ResolveResult {
    let Some(body) = body else {
        return ResolveResult::warning(missing_warning);
    };

    let Some(sub_path) = sub_path else {
        return ResolveResult::warning_with(body, ResolveWarning::MissingBodyPath);
    };

    // '*' fetches the whole body regardless of content type.
    if sub_path == "*" {
        return ResolveResult::Success(body);
    }

    let (sub_path, force_json, force_xml) =
        if let Some(stripped) = sub_path.strip_prefix(FORCE_JSON_PREFIX) {
            (stripped, true, false)
        } else if let Some(stripped) = sub_path.strip_prefix(FORCE_XML_PREFIX) {
            (stripped, false, true)
        } else {
            (sub_path, false, false)
        };

    let content_type = headers.get("content-type");
    if mime::is_json(content_type)
        || (force_json || mime::is_javascript(content_type)) && is_json_text(&body)
    {
        json_path::resolve(&body, sub_path)
    } else if force_xml || mime::is_xml(content_type) {
        xml_path::resolve(&body, sub_path)
    } else {
        ResolveResult::warning_with(body, ResolveWarning::UnsupportedBodyContentType)
    }
}

fn is_json_text(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body).is_ok()
}
