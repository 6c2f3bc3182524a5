//! Authentication schemes.
//!
//! The engine understands four schemes, selected by the first
//! whitespace-delimited token of the `Authorization` header value. A claimed
//! header is removed from the outgoing request; the scheme substitutes its
//! own authorization mechanism. Unrecognized schemes pass through untouched
//! for the server to interpret.
//!
//! Schemes contribute to a send at two well-defined points invoked by the
//! transport executor: a pre-send transform (SigV4 signing, Cognito bearer
//! injection) and a post-receive transform (the Digest challenge-response
//! retry). There is no callback registration; dispatch is a match on the
//! closed [`AuthScheme`] enum.

pub mod cognito;
pub mod digest;
pub mod scheme;
pub mod sigv4;

pub use cognito::CognitoCredentials;
pub use scheme::{classify, AuthScheme};
pub use sigv4::AwsCredentials;
