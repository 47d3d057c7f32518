//! Pooled HTTP client command line (v1)
//!
//! Fires one request (optionally several times) through the dual-backend
//! client and prints what came back.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────┐
//!                 │                      HttpClient                        │
//!   HttpRequest   │  ┌──────────────┐    ┌────────────────────────────┐   │
//!   ──────────────┼─▶│  dispatcher  │───▶│ select_backend             │   │
//!                 │  │ (deadline)   │    └──────┬──────────────┬──────┘   │
//!                 │  └──────────────┘           │              │          │
//!                 │                             ▼              ▼          │
//!                 │                  ┌──────────────┐  ┌──────────────┐   │
//!                 │                  │   per-host   │  │    pooled    │   │
//!                 │                  │ direct pool  │  │ proxy pool   │   │
//!                 │                  └──────┬───────┘  └──────┬───────┘   │
//!   HttpResponse  │                         ▼                 ▼           │
//!   ◀─────────────┼──────────────── header merge ◀──── network I/O        │
//!                 └───────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pooled_http_client::config::{load_config, ClientConfig};
use pooled_http_client::http::ProxyEndpoint;
use pooled_http_client::observability::{logging, metrics};
use pooled_http_client::{Backend, HttpClient, HttpResponse};

#[derive(Parser)]
#[command(name = "http-exec")]
#[command(about = "Execute HTTP requests through the pooled dual-backend client", long_about = None)]
struct Cli {
    /// Target URI.
    uri: String,

    /// HTTP method; omitted means POST with --data, GET otherwise.
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Request header as "Name: value" (repeatable).
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Backend: auto, per-host or pooled.
    #[arg(short, long, default_value = "auto")]
    backend: String,

    /// HTTP proxy as host:port.
    #[arg(long)]
    proxy: Option<ProxyEndpoint>,

    /// General timeout in milliseconds (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip TLS verification (per-host backend).
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Only dial IPv4 addresses (per-host backend).
    #[arg(long)]
    no_ipv6: bool,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of times to send the request.
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Print a JSON summary instead of the raw response.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("http-exec v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = HttpClient::new(config)?;

    let mut request = client.request(&cli.uri)?;
    request.method = cli.method.clone();
    request.body = cli.data.clone().map(Into::into);
    request.proxy = cli.proxy.clone();
    request.https_insecure |= cli.insecure;
    request.disable_ipv6 |= cli.no_ipv6;
    if let Some(ms) = cli.timeout_ms {
        request.general_timeout = Duration::from_millis(ms);
    }
    if let Some(forced) = Backend::parse_selector(&cli.backend)? {
        request.force_backend = Some(forced);
    }
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid header '{}', expected 'Name: value'", raw))?;
        request = request.header(name.trim(), value.trim());
    }

    let mut failed = false;
    for _ in 0..cli.count.max(1) {
        let response = client.execute(&request).await?;
        failed |= response.error.is_some();
        if cli.json {
            println!("{}", summary(&response));
        } else {
            print_response(&response);
        }
    }

    tracing::info!(
        direct_pools = client.direct_pool().len(),
        proxy_pools = client.proxy_pool().len(),
        "Done"
    );

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn summary(response: &HttpResponse) -> serde_json::Value {
    serde_json::json!({
        "backend": response.backend,
        "status": response.status_code,
        "content_length": response.content_length,
        "elapsed_ms": response.elapsed_ms() as u64,
        "headers": response.headers,
        "body": response.text(),
        "error": response.error.as_ref().map(|e| e.to_string()),
    })
}

fn print_response(response: &HttpResponse) {
    if let Some(err) = &response.error {
        eprintln!("error: {} ({} ms)", err, response.elapsed_ms());
        return;
    }
    println!("HTTP {} ({} ms)", response.status_code, response.elapsed_ms());
    for (name, value) in response.headers.iter() {
        for v in value.values() {
            println!("{}: {}", name, v);
        }
    }
    println!();
    println!("{}", response.text());
}
