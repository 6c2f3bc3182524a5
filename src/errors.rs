/// Engine-level failures surfaced to the caller.
///
/// Cancellation is deliberately not represented here; a cancelled send
/// settles as a [`SendOutcome::Cancelled`](crate::client::SendOutcome)
/// value, optionally carrying a partial response.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// Failure while preparing an authentication scheme, surfaced before
    /// any network call for the target resource is made.
    #[error("Authentication setup failed: {0}")]
    AuthSetup(String),

    /// Connection-level failure; the message carries a human-readable
    /// classification (timeout, refused, unreachable). Never retried.
    #[error("{0}")]
    Transport(String),

    #[error("Engine configuration error: {0}")]
    Config(String),
}
