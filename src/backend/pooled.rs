//! Pooled backend.
//!
//! # Responsibilities
//! - Shared direct `reqwest::Client` for calls without a proxy
//! - One client per proxy endpoint, from the proxy registry
//! - Redirects disabled; reqwest never retries on its own
//!
//! # Design Decisions
//! - Environment proxy variables are ignored; only the request's proxy counts
//! - Content length is always the received body length

use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{build_header_map, Backend, Target};
use crate::config::PooledBackendConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{BackendOutcome, HttpRequest, ProxyEndpoint, ResponseHeaders};
use crate::pool::{PoolRegistry, ProxyKey};

/// Backend B: executes requests through pooled reqwest clients.
#[derive(Debug)]
pub struct PooledBackend {
    config: PooledBackendConfig,
    direct: Arc<reqwest::Client>,
    proxies: PoolRegistry<ProxyKey, reqwest::Client>,
}

impl PooledBackend {
    pub fn new(config: PooledBackendConfig, max_proxy_pools: usize) -> ClientResult<Self> {
        let direct = builder(&config).no_proxy().build()?;
        Ok(Self {
            config,
            direct: Arc::new(direct),
            proxies: PoolRegistry::new("proxy", max_proxy_pools),
        })
    }

    pub fn proxy_pool(&self) -> &PoolRegistry<ProxyKey, reqwest::Client> {
        &self.proxies
    }

    async fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> ClientResult<Arc<reqwest::Client>> {
        let Some(endpoint) = proxy else {
            tokio::task::yield_now().await;
            return Ok(Arc::clone(&self.direct));
        };

        let key = ProxyKey::from(endpoint);
        self.proxies
            .get_or_create(&key, || {
                let proxy = reqwest::Proxy::all(endpoint.url())?;
                Ok(builder(&self.config).proxy(proxy).build()?)
            })
            .await
    }

    pub async fn execute(&self, request: &HttpRequest) -> ClientResult<BackendOutcome> {
        let plan = Backend::Pooled.method_plan(request.method.as_deref(), request.has_body())?;
        // Reject non-http(s) URIs before reqwest does, with the same error as per-host.
        Target::parse(&request.uri)?;
        let headers = build_header_map(&request.headers)?;

        if request.https_insecure && !self.config.accept_invalid_certs {
            tracing::debug!(
                uri = %request.uri,
                "https_insecure ignored by pooled backend, set backend_b.accept_invalid_certs instead"
            );
        }
        tracing::debug!(proxy = ?request.proxy, "From pool");
        let client = self.client_for(request.proxy.as_ref()).await?;

        let mut builder = client
            .request(plan.method, &request.uri)
            .headers(headers)
            .timeout(request.network_timeout);
        if plan.send_body {
            builder = builder.body(request.body_bytes());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| network_error(e, request.network_timeout))?;
        tokio::task::yield_now().await;

        let status_code = response.status().as_u16();
        let headers = ResponseHeaders::from(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(e, request.network_timeout))?;
        tokio::task::yield_now().await;

        tracing::debug!(
            status = status_code,
            ms = started.elapsed().as_millis() as u64,
            "urlopen ok"
        );

        Ok(BackendOutcome {
            status_code,
            content_length: body.len() as u64,
            headers,
            body,
        })
    }
}

fn builder(config: &PooledBackendConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
}

fn network_error(e: reqwest::Error, network_timeout: Duration) -> ClientError {
    if e.is_timeout() {
        ClientError::NetworkTimeout(network_timeout)
    } else {
        ClientError::Request(e)
    }
}
