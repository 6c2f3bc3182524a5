pub mod headers;
pub mod request;
pub mod resolve;
pub mod response;
pub mod settings;

pub use headers::Headers;
pub use request::{HttpRequest, RequestBody};
pub use resolve::{ResolveError, ResolveResult, ResolveWarning};
pub use response::{HttpResponse, Timings};
pub use settings::{HostCertificate, RequestSettings};
