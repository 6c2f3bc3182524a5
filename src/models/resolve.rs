//! Result model for response-variable resolution.
//!
//! Resolution never panics and never uses the error channel for partial
//! outcomes: a `Warning` is a fully recoverable "no exact value, but here is
//! the closest context" result, while `Error` means the expression itself is
//! unusable (bad syntax or no source value).

use std::fmt;

/// Hard failures of a path expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No captured value, or an empty path.
    NoRequestVariablePath,
    /// The path does not match the reference grammar.
    InvalidRequestVariableReference,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResolveError::NoRequestVariablePath => "no request variable path provided",
            ResolveError::InvalidRequestVariableReference => {
                "invalid request variable reference syntax"
            }
        };
        f.write_str(text)
    }
}

/// Recoverable resolution outcomes; may still carry a best-effort value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveWarning {
    MissingRequestEntityName,
    MissingRequestEntityPart,
    MissingHeaderName,
    IncorrectHeaderName,
    MissingBodyPath,
    RequestBodyNotExist,
    ResponseBodyNotExist,
    UnsupportedBodyContentType,
    IncorrectJsonPath,
    InvalidJsonPath,
    IncorrectXPath,
    InvalidXPath,
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResolveWarning::MissingRequestEntityName => {
                "missing entity name, please specify request or response"
            }
            ResolveWarning::MissingRequestEntityPart => {
                "missing entity part, please specify headers or body"
            }
            ResolveWarning::MissingHeaderName => "missing header name",
            ResolveWarning::IncorrectHeaderName => "header name is incorrect",
            ResolveWarning::MissingBodyPath => "missing body path",
            ResolveWarning::RequestBodyNotExist => "request body does not exist",
            ResolveWarning::ResponseBodyNotExist => "response body does not exist",
            ResolveWarning::UnsupportedBodyContentType => {
                "the body content type does not support path evaluation"
            }
            ResolveWarning::IncorrectJsonPath => "JSONPath did not match the body",
            ResolveWarning::InvalidJsonPath => "invalid JSONPath",
            ResolveWarning::IncorrectXPath => "XPath did not match the body",
            ResolveWarning::InvalidXPath => "invalid XPath",
        };
        f.write_str(text)
    }
}

/// Outcome of evaluating a path expression against a captured exchange.
///
/// Exactly one variant applies. `Warning` may carry a best-effort value,
/// such as the rendered header map when no specific header was named.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult {
    Success(String),
    Warning {
        value: Option<String>,
        message: ResolveWarning,
    },
    Error(ResolveError),
}

impl ResolveResult {
    pub fn warning(message: ResolveWarning) -> Self {
        ResolveResult::Warning {
            value: None,
            message,
        }
    }

    pub fn warning_with(value: impl Into<String>, message: ResolveWarning) -> Self {
        ResolveResult::Warning {
            value: Some(value.into()),
            message,
        }
    }

    /// The resolved value, if any variant carries one.
    pub fn value(&self) -> Option<&str> {
        match self {
            ResolveResult::Success(value) => Some(value),
            ResolveResult::Warning { value, .. } => value.as_deref(),
            ResolveResult::Error(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResolveResult::Success(_))
    }
}
