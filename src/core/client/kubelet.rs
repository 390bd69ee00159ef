use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::core::clock::Clock;
use crate::core::config::Config;
use crate::core::decode::Decoder;
use crate::core::storage::MetricsBatch;
use crate::core::util::buffer_pool::BufferPool;

/// Failure of one agent call. `Timeout` is also produced by the scraper when
/// the per-node deadline fires before the call returns.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    BadStatus(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("deadline exceeded")]
    Timeout,
}

impl AgentError {
    /// Short tag used as the telemetry reason label.
    pub fn reason(&self) -> &'static str {
        match self {
            AgentError::Transport(_) => "transport",
            AgentError::BadStatus(_) => "bad_status",
            AgentError::Decode(_) => "decode",
            AgentError::Timeout => "timeout",
        }
    }
}

/// One node as the agent client sees it: a resolved connect address plus the
/// advertised kubelet port, if any.
#[derive(Debug, Clone)]
pub struct NodeTarget {
    pub name: String,
    pub address: String,
    pub node_status_port: Option<i32>,
}

/// The per-node metrics fetch, behind a trait so the scraper can be driven
/// by a stub in tests.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn fetch(&self, target: &NodeTarget) -> Result<MetricsBatch, AgentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unknown scheme {other:?}, expected http or https")),
        }
    }
}

/// HTTP client for the per-node agent endpoint. The wire format is fixed at
/// construction; response bodies go through a shared buffer pool.
pub struct KubeletClient {
    http: reqwest::Client,
    scheme: Scheme,
    default_port: u16,
    use_node_status_port: bool,
    decoder: Decoder,
    token: Option<String>,
    buffers: BufferPool,
    clock: Arc<dyn Clock>,
}

impl KubeletClient {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.kubelet_insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().context("building kubelet http client")?;

        let token = match &config.kubelet_token_file {
            Some(path) => {
                let token = std::fs::read_to_string(path)
                    .with_context(|| format!("reading kubelet token file {}", path.display()))?;
                Some(token.trim().to_string())
            }
            None => None,
        };

        Ok(Self {
            http,
            scheme: config.kubelet_scheme,
            default_port: config.kubelet_port,
            use_node_status_port: config.use_node_status_port,
            decoder: config.kubelet_endpoint,
            token,
            buffers: BufferPool::new(32),
            clock,
        })
    }

    fn url(&self, target: &NodeTarget) -> String {
        let port = match target.node_status_port {
            Some(port) if self.use_node_status_port && port > 0 => port as u16,
            _ => self.default_port,
        };
        format!(
            "{}://{}{}",
            self.scheme,
            host_port(&target.address, port),
            self.decoder.path()
        )
    }
}

#[async_trait]
impl AgentClient for KubeletClient {
    async fn fetch(&self, target: &NodeTarget) -> Result<MetricsBatch, AgentError> {
        let url = self.url(target);
        debug!(node = %target.name, %url, "scraping agent");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::BadStatus(status.as_u16()));
        }

        let mut body = self.buffers.acquire();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            body.extend_from_slice(&chunk);
        }

        self.decoder
            .decode(&body, &target.name, self.clock.now())
            .map_err(|err| AgentError::Decode(err.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::Timeout
    } else {
        AgentError::Transport(err.to_string())
    }
}

/// Join address and port, bracketing bare IPv6 addresses.
fn host_port(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}
