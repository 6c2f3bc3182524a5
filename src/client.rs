//! Transport layer: options building, proxy/certificate resolution, the
//! buffered and streamed executors, and response normalization.

pub mod certificate;
pub mod normalize;
pub mod options;
pub mod proxy;
pub mod transport;

pub use options::PreparedRequest;
pub use transport::SendOutcome;
