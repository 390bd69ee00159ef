pub mod prom_text;
pub mod summary;
pub mod summary_dto;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::storage::MetricsBatch;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid summary document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid text exposition: {0}")]
    Text(String),
    #[error("response body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Wire format of the agent endpoint, fixed at client construction. The two
/// formats never mix within one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// JSON from `/stats/summary`.
    Summary,
    /// Prometheus text from `/metrics/resource`.
    Resource,
}

impl Decoder {
    /// Path and query to request from the agent.
    pub fn path(&self) -> &'static str {
        match self {
            Decoder::Summary => "/stats/summary?only_cpu_and_memory=true",
            Decoder::Resource => "/metrics/resource",
        }
    }

    pub fn decode(
        &self,
        body: &[u8],
        node_name: &str,
        default_time: DateTime<Utc>,
    ) -> Result<MetricsBatch, DecodeError> {
        match self {
            Decoder::Summary => {
                let summary = serde_json::from_slice(body)?;
                Ok(summary::decode_summary(&summary))
            }
            Decoder::Resource => {
                let text = std::str::from_utf8(body)?;
                prom_text::decode_resource(text, node_name, default_time)
            }
        }
    }
}

impl FromStr for Decoder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Decoder::Summary),
            "resource" => Ok(Decoder::Resource),
            other => Err(format!(
                "unknown kubelet endpoint {other:?}, expected \"summary\" or \"resource\""
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths_match_the_format() {
        assert!(Decoder::Summary.path().starts_with("/stats/summary"));
        assert_eq!(Decoder::Resource.path(), "/metrics/resource");
    }

    #[test]
    fn parses_from_config_strings() {
        assert_eq!("summary".parse::<Decoder>().unwrap(), Decoder::Summary);
        assert_eq!("resource".parse::<Decoder>().unwrap(), Decoder::Resource);
        assert!("proto".parse::<Decoder>().is_err());
    }
}
