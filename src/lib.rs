//! Outbound HTTP request execution with chained-response variables.
//!
//! The crate takes a parsed request plus a settings snapshot, executes it
//! (auth resolution, proxy/certificate selection, optional event-stream
//! consumption, cooperative cancellation) and hands back a normalized
//! response. Completed responses of named requests can be referenced from
//! later requests through a dotted path-expression grammar.

pub mod auth;
pub mod cache;
pub mod client;
pub mod cookies;
pub mod engine;
pub mod errors;
pub mod mime;
pub mod models;
pub mod resolver;

pub use client::SendOutcome;
pub use engine::RequestEngine;
pub use errors::EngineError;
pub use models::{
    Headers, HostCertificate, HttpRequest, HttpResponse, RequestBody, RequestSettings,
    ResolveError, ResolveResult, ResolveWarning, Timings,
};
