//! Request/response value objects.
//!
//! # Data Flow
//! ```text
//! HttpRequest (caller, immutable)
//!     → HttpClient::execute
//!     → backend produces BackendOutcome
//!         → headers.rs (merge repeated names)
//!     → HttpResponse (status, body, headers, elapsed, error)
//! ```

pub mod headers;
pub mod request;
pub mod response;

pub use headers::{HeaderValue, ResponseHeaders};
pub use request::{HttpRequest, ProxyEndpoint};
pub use response::{BackendOutcome, HttpResponse};
