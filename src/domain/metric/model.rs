//! `metrics.k8s.io/v1beta1`-shaped API objects assembled by the read paths.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta, Time};
use serde::{Deserialize, Serialize};

use crate::core::storage::{ContainerUsage, ResourceUsage, TimeInfo};
use crate::core::util::quantity::{cpu_quantity, memory_quantity};

pub const API_VERSION: &str = "metrics.k8s.io/v1beta1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl From<ResourceUsage> for Usage {
    fn from(usage: ResourceUsage) -> Self {
        Self {
            cpu: cpu_quantity(usage.cpu_nanocores),
            memory: memory_quantity(usage.memory_bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub timestamp: Time,
    pub window: String,
    pub usage: Usage,
}

impl NodeMetrics {
    pub fn new(
        name: &str,
        labels: &BTreeMap<String, String>,
        time_info: TimeInfo,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            kind: "NodeMetrics".to_string(),
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            timestamp: Time(time_info.timestamp),
            window: format_window(time_info.window),
            usage: usage.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetrics {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub timestamp: Time,
    pub window: String,
    pub containers: Vec<ContainerMetrics>,
}

impl PodMetrics {
    pub fn new(
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
        time_info: TimeInfo,
        containers: Vec<ContainerUsage>,
    ) -> Self {
        Self {
            kind: "PodMetrics".to_string(),
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            timestamp: Time(time_info.timestamp),
            window: format_window(time_info.window),
            containers: containers
                .into_iter()
                .map(|c| ContainerMetrics {
                    name: c.name,
                    usage: c.usage.into(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricsList {
    pub kind: String,
    pub api_version: String,
    pub metadata: ListMeta,
    pub items: Vec<NodeMetrics>,
}

impl NodeMetricsList {
    pub fn new(items: Vec<NodeMetrics>) -> Self {
        Self {
            kind: "NodeMetricsList".to_string(),
            api_version: API_VERSION.to_string(),
            metadata: ListMeta::default(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetricsList {
    pub kind: String,
    pub api_version: String,
    pub metadata: ListMeta,
    pub items: Vec<PodMetrics>,
}

impl PodMetricsList {
    pub fn new(items: Vec<PodMetrics>) -> Self {
        Self {
            kind: "PodMetricsList".to_string(),
            api_version: API_VERSION.to_string(),
            metadata: ListMeta::default(),
            items,
        }
    }
}

/// Render a rate window the way Kubernetes durations print: `10s`, `1m30s`,
/// with fractional seconds only when present.
pub fn format_window(window: TimeDelta) -> String {
    let total_ms = window.num_milliseconds().max(0);
    let mut secs = total_ms / 1000;
    let ms = total_ms % 1000;

    let mut out = String::new();
    if secs >= 3600 {
        out.push_str(&format!("{}h", secs / 3600));
        secs %= 3600;
    }
    if secs >= 60 || (!out.is_empty() && (secs > 0 || ms > 0)) {
        out.push_str(&format!("{}m", secs / 60));
        secs %= 60;
    }
    if ms > 0 {
        let frac = format!("{ms:03}");
        let frac = frac.trim_end_matches('0');
        out.push_str(&format!("{secs}.{frac}s"));
    } else if secs > 0 || out.is_empty() {
        out.push_str(&format!("{secs}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn windows_print_like_kubernetes_durations() {
        assert_eq!(format_window(TimeDelta::seconds(10)), "10s");
        assert_eq!(format_window(TimeDelta::seconds(90)), "1m30s");
        assert_eq!(format_window(TimeDelta::milliseconds(15_500)), "15.5s");
        assert_eq!(format_window(TimeDelta::seconds(3600)), "1h");
        assert_eq!(format_window(TimeDelta::seconds(3661)), "1h1m1s");
        assert_eq!(format_window(TimeDelta::zero()), "0s");
    }

    #[test]
    fn node_metrics_serialize_with_k8s_field_names() {
        let metrics = NodeMetrics::new(
            "node1",
            &BTreeMap::new(),
            TimeInfo {
                timestamp: DateTime::from_timestamp(1_700_000_010, 0).unwrap(),
                window: TimeDelta::seconds(10),
            },
            ResourceUsage {
                cpu_nanocores: 1_000_000_000,
                memory_bytes: 120 << 20,
            },
        );
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["apiVersion"], "metrics.k8s.io/v1beta1");
        assert_eq!(json["kind"], "NodeMetrics");
        assert_eq!(json["metadata"]["name"], "node1");
        assert_eq!(json["window"], "10s");
        assert_eq!(json["usage"]["cpu"], "1000000000n");
        assert_eq!(json["usage"]["memory"], "120Mi");
    }
}
