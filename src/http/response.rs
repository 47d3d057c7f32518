//! Response produced by one call.
//!
//! # Responsibilities
//! - Hold the outcome of a call: status, body, headers, content length
//! - Record which backend ran and how long the call took
//! - Carry the captured error instead of raising it
//!
//! # Design Decisions
//! - Body/status stay at zero values unless the backend completed
//! - A response exists for every call, failed or not

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::ClientError;
use crate::http::headers::ResponseHeaders;
use crate::http::request::HttpRequest;

/// What a backend hands back on success.
#[derive(Debug, Default)]
pub struct BackendOutcome {
    pub status_code: u16,
    pub body: Bytes,
    pub content_length: u64,
    pub headers: ResponseHeaders,
}

impl BackendOutcome {
    /// Content length resolution: reported length, else body length, else 0.
    pub fn resolve_content_length(reported: Option<u64>, body: &Bytes) -> u64 {
        reported.unwrap_or(body.len() as u64)
    }
}

/// Result of [`HttpClient::execute`](crate::client::HttpClient::execute).
#[derive(Debug)]
pub struct HttpResponse {
    /// The request this response answers.
    pub request: HttpRequest,
    /// Backend that handled the call, once resolved.
    pub backend: Option<Backend>,
    /// HTTP status code, 0 when no response was received.
    pub status_code: u16,
    /// Raw body bytes.
    pub body: Bytes,
    /// Resolved content length.
    pub content_length: u64,
    /// Merged response headers.
    pub headers: ResponseHeaders,
    /// Wall time of the whole call.
    pub elapsed: Duration,
    /// Captured failure, `None` on success.
    pub error: Option<ClientError>,
}

impl HttpResponse {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            backend: None,
            status_code: 0,
            body: Bytes::new(),
            content_length: 0,
            headers: ResponseHeaders::new(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    /// Copy a completed backend outcome onto the response.
    pub fn apply(&mut self, outcome: BackendOutcome) {
        self.status_code = outcome.status_code;
        self.body = outcome.body;
        self.content_length = outcome.content_length;
        self.headers = outcome.headers;
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// No error and a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = self.backend.map(|b| b.to_string());
        write!(
            f,
            "backend={} status={} len={} ms={}",
            backend.as_deref().unwrap_or("none"),
            self.status_code,
            self.content_length,
            self.elapsed_ms()
        )?;
        if let Some(err) = &self.error {
            write!(f, " error={}", err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_resolution() {
        let body = Bytes::from_static(b"abcd");
        assert_eq!(BackendOutcome::resolve_content_length(Some(10), &body), 10);
        assert_eq!(BackendOutcome::resolve_content_length(None, &body), 4);
        assert_eq!(BackendOutcome::resolve_content_length(None, &Bytes::new()), 0);
    }

    #[test]
    fn new_response_is_zeroed() {
        let resp = HttpResponse::new(HttpRequest::new("http://x/"));
        assert_eq!(resp.status_code, 0);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_length, 0);
        assert!(resp.headers.is_empty());
        assert!(!resp.is_success());
    }
}
