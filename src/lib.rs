//! Pooled dual-backend HTTP client library.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod pool;

pub use backend::Backend;
pub use client::HttpClient;
pub use config::schema::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HeaderValue, HttpRequest, HttpResponse};
