use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::core::client::kubelet::Scheme;
use crate::core::client::resolver::{AddressType, DEFAULT_ADDRESS_TYPES};
use crate::core::decode::Decoder;

/// Runtime configuration, loaded once at startup from `RUSTMETRICS_*`
/// environment variables (a `.env` file is honored in development).
#[derive(Debug, Clone)]
pub struct Config {
    /// Tick interval of the scrape loop; also bounds the fresh-container
    /// window in the store.
    pub metric_resolution: Duration,
    /// Upper bound on one scrape cycle's agent calls. Must not exceed
    /// `metric_resolution`.
    pub scrape_timeout: Duration,
    /// Resolver priority for node connect addresses.
    pub address_types: Vec<AddressType>,
    /// Agent port used when the node does not advertise one.
    pub kubelet_port: u16,
    /// Prefer the port from the node's kubelet daemon endpoint.
    pub use_node_status_port: bool,
    pub kubelet_scheme: Scheme,
    /// Which agent endpoint (and thus wire format) to scrape.
    pub kubelet_endpoint: Decoder,
    /// Skip TLS verification for self-signed kubelet certificates.
    pub kubelet_insecure_tls: bool,
    /// Service-account token sent as a bearer header to the agent.
    pub kubelet_token_file: Option<PathBuf>,
    /// API listen address.
    pub bind_addr: SocketAddr,
    /// Optional directory for rolling file logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metric_resolution: Duration::from_secs(60),
            scrape_timeout: Duration::from_secs(10),
            address_types: DEFAULT_ADDRESS_TYPES.to_vec(),
            kubelet_port: 10250,
            use_node_status_port: false,
            kubelet_scheme: Scheme::Https,
            kubelet_endpoint: Decoder::Resource,
            kubelet_insecure_tls: false,
            kubelet_token_file: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let metric_resolution =
            Duration::from_secs(parse_env("RUSTMETRICS_RESOLUTION_SECS", 60u64)?);
        let scrape_timeout =
            Duration::from_secs(parse_env("RUSTMETRICS_SCRAPE_TIMEOUT_SECS", 10u64)?);

        let address_types = match env::var("RUSTMETRICS_ADDRESS_TYPES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<AddressType>()
                        .map_err(|err| anyhow::anyhow!("RUSTMETRICS_ADDRESS_TYPES: {err}"))
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => defaults.address_types,
        };

        let config = Config {
            metric_resolution,
            scrape_timeout,
            address_types,
            kubelet_port: parse_env("RUSTMETRICS_KUBELET_PORT", defaults.kubelet_port)?,
            use_node_status_port: parse_env(
                "RUSTMETRICS_USE_NODE_STATUS_PORT",
                defaults.use_node_status_port,
            )?,
            kubelet_scheme: parse_env("RUSTMETRICS_KUBELET_SCHEME", defaults.kubelet_scheme)?,
            kubelet_endpoint: parse_env("RUSTMETRICS_KUBELET_ENDPOINT", defaults.kubelet_endpoint)?,
            kubelet_insecure_tls: parse_env(
                "RUSTMETRICS_KUBELET_INSECURE_TLS",
                defaults.kubelet_insecure_tls,
            )?,
            kubelet_token_file: env::var("RUSTMETRICS_KUBELET_TOKEN_FILE")
                .ok()
                .map(PathBuf::from),
            bind_addr: parse_env("RUSTMETRICS_BIND_ADDR", defaults.bind_addr)?,
            log_dir: env::var("RUSTMETRICS_LOG_DIR").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metric_resolution.is_zero() {
            bail!("metric resolution must be positive");
        }
        if self.scrape_timeout.is_zero() {
            bail!("scrape timeout must be positive");
        }
        if self.scrape_timeout > self.metric_resolution {
            bail!(
                "scrape timeout ({:?}) must not exceed the metric resolution ({:?})",
                self.scrape_timeout,
                self.metric_resolution
            );
        }
        if self.address_types.is_empty() {
            bail!("at least one node address type is required");
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("invalid value {raw:?} for {key}: {err}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn scrape_timeout_must_fit_in_the_resolution() {
        let config = Config {
            metric_resolution: Duration::from_secs(10),
            scrape_timeout: Duration::from_secs(30),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_address_priority_is_rejected() {
        let config = Config {
            address_types: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
