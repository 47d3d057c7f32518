//! Request dispatcher.
//!
//! # Responsibilities
//! - Single entry point `execute(request) -> response`
//! - Pick the backend for each call
//! - Enforce the general deadline around the whole call
//! - Record elapsed time and outcome on every exit path
//!
//! # Design Decisions
//! - Failures are data: they land in `HttpResponse::error`
//! - Only pool capacity exhaustion is returned as `Err`
//! - A timed-out call is cancelled by dropping its future

use std::time::Instant;
use tokio::time::timeout;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{select_backend, Backend, HostClient, PerHostBackend, PooledBackend};
use crate::config::validation::validate_config;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{BackendOutcome, HttpRequest, HttpResponse};
use crate::observability::metrics;
use crate::pool::{DirectKey, PoolRegistry, ProxyKey};

/// Dual-backend HTTP client owning both pool registries.
#[derive(Debug)]
pub struct HttpClient {
    config: ClientConfig,
    per_host: PerHostBackend,
    pooled: PooledBackend,
}

impl HttpClient {
    /// Create a client. Registries start empty.
    ///
    /// The configuration is validated first; every problem found is reported
    /// in one [`ClientError::InvalidConfig`].
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        validate_config(&config).map_err(|errors| {
            let problems: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ClientError::InvalidConfig(problems.join("; "))
        })?;

        let per_host = PerHostBackend::new(config.pools.direct_max_size);
        let pooled = PooledBackend::new(config.backend_b.clone(), config.pools.proxy_max_size)?;

        tracing::debug!(
            direct_max_size = config.pools.direct_max_size,
            proxy_max_size = config.pools.proxy_max_size,
            "Http client created"
        );

        Ok(Self {
            config,
            per_host,
            pooled,
        })
    }

    /// A request pre-filled with the configured defaults.
    pub fn request(&self, uri: impl Into<String>) -> ClientResult<HttpRequest> {
        HttpRequest::with_defaults(uri, &self.config.defaults)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Registry of per-host clients.
    pub fn direct_pool(&self) -> &PoolRegistry<DirectKey, HostClient> {
        self.per_host.pool()
    }

    /// Registry of proxy clients of the pooled backend.
    pub fn proxy_pool(&self) -> &PoolRegistry<ProxyKey, reqwest::Client> {
        self.pooled.proxy_pool()
    }

    /// Execute one call.
    ///
    /// Always yields a response unless a pool registry is full, in which case
    /// [`ClientError::CapacityExceeded`] is returned. Any other failure,
    /// including the general timeout, is stored in [`HttpResponse::error`].
    pub async fn execute(&self, request: &HttpRequest) -> ClientResult<HttpResponse> {
        let started = Instant::now();
        let mut response = HttpResponse::new(request.clone());
        let general_timeout = request.general_timeout;

        let span = tracing::debug_span!("http_call", call_id = %Uuid::new_v4());
        let result = timeout(
            general_timeout,
            self.dispatch(request, &mut response.backend).instrument(span),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => response.apply(outcome),
            Ok(Err(e)) if e.is_capacity_exceeded() => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    req = %request,
                    "Http call aborted"
                );
                metrics::record_request(&backend_label(response.backend), e.kind(), started.elapsed());
                return Err(e);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, req = %request, "Http call failed");
                response.error = Some(e);
            }
            Err(_) => {
                response.error = Some(ClientError::Timeout { general_timeout });
            }
        }

        tokio::task::yield_now().await;
        response.elapsed = started.elapsed();

        tracing::info!(
            general_timeout_sec = general_timeout.as_secs_f64(),
            resp = %response,
            req = %request,
            "Http call over"
        );
        let outcome = response.error.as_ref().map(ClientError::kind).unwrap_or("ok");
        metrics::record_request(&backend_label(response.backend), outcome, response.elapsed);

        Ok(response)
    }

    async fn dispatch(
        &self,
        request: &HttpRequest,
        used: &mut Option<Backend>,
    ) -> ClientResult<BackendOutcome> {
        let backend = select_backend(request);
        *used = Some(backend);
        tracing::debug!(backend = %backend, "Http using backend");

        match backend {
            Backend::PerHost => self.per_host.execute(request).await,
            Backend::Pooled => self.pooled.execute(request).await,
        }
    }
}

fn backend_label(backend: Option<Backend>) -> String {
    backend.map(|b| b.to_string()).unwrap_or_else(|| "none".to_string())
}
