use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prometheus_parse::{Sample, Scrape, Value};
use tracing::debug;

use crate::core::storage::{MetricsBatch, MetricsPoint, PodRef};

use super::DecodeError;

const NODE_CPU_USAGE: &str = "node_cpu_usage_seconds_total";
const NODE_MEMORY_WORKING_SET: &str = "node_memory_working_set_bytes";
const CONTAINER_CPU_USAGE: &str = "container_cpu_usage_seconds_total";
const CONTAINER_MEMORY_WORKING_SET: &str = "container_memory_working_set_bytes";
const CONTAINER_START_TIME: &str = "container_start_time_seconds";

#[derive(Debug, Default)]
struct ContainerSeries {
    cpu: Option<(u64, DateTime<Utc>)>,
    memory: Option<u64>,
    start_time: Option<DateTime<Utc>>,
}

/// Decode the kubelet `/metrics/resource` text exposition for one node.
///
/// The node name comes from the caller since the exposition does not carry
/// it; samples without an explicit timestamp take `default_time`.
pub fn decode_resource(
    body: &str,
    node_name: &str,
    default_time: DateTime<Utc>,
) -> Result<MetricsBatch, DecodeError> {
    let lines = body.lines().map(|line| Ok(line.to_owned()));
    let scrape = Scrape::parse_at(lines, default_time)
        .map_err(|err| DecodeError::Text(err.to_string()))?;

    let mut node_cpu: Option<(u64, DateTime<Utc>)> = None;
    let mut node_memory: Option<u64> = None;
    let mut containers: HashMap<PodRef, HashMap<String, ContainerSeries>> = HashMap::new();

    for sample in &scrape.samples {
        let Some(value) = sample_value(&sample.value) else {
            continue;
        };
        match sample.metric.as_str() {
            NODE_CPU_USAGE => node_cpu = Some((to_cpu_nanoseconds(value), sample.timestamp)),
            NODE_MEMORY_WORKING_SET => node_memory = Some(value as u64),
            CONTAINER_CPU_USAGE | CONTAINER_MEMORY_WORKING_SET | CONTAINER_START_TIME => {
                let Some((pod_ref, container)) = container_identity(sample) else {
                    debug!(metric = %sample.metric, "skipping container sample without identity labels");
                    continue;
                };
                let series = containers
                    .entry(pod_ref)
                    .or_default()
                    .entry(container)
                    .or_default();
                match sample.metric.as_str() {
                    CONTAINER_CPU_USAGE => {
                        series.cpu = Some((to_cpu_nanoseconds(value), sample.timestamp));
                    }
                    CONTAINER_MEMORY_WORKING_SET => series.memory = Some(value as u64),
                    _ => series.start_time = Some(epoch_seconds_to_time(value)),
                }
            }
            _ => {}
        }
    }

    let mut batch = MetricsBatch::default();

    match assemble_node(node_cpu, node_memory) {
        Some(point) => {
            batch.nodes.insert(node_name.to_string(), point);
        }
        None => debug!(node = %node_name, "dropping node point with missing or zero series"),
    }

    'pods: for (pod_ref, pod_series) in containers {
        let mut points = crate::core::storage::PodMetricsPoint::default();
        for (name, series) in pod_series {
            let Some(point) = assemble_container(series) else {
                debug!(pod = %pod_ref, container = %name, "dropping pod with zero usage series");
                continue 'pods;
            };
            points.containers.insert(name, point);
        }
        batch.pods.insert(pod_ref, points);
    }

    Ok(batch)
}

fn sample_value(value: &Value) -> Option<f64> {
    match value {
        Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => Some(*v),
        _ => None,
    }
}

fn container_identity(sample: &Sample) -> Option<(PodRef, String)> {
    let container = sample.labels.get("container")?;
    let namespace = sample.labels.get("namespace")?;
    let pod = sample.labels.get("pod")?;
    Some((PodRef::new(namespace, pod), container.to_string()))
}

/// Cumulative CPU arrives as float seconds; the store works in
/// nanocore-seconds.
fn to_cpu_nanoseconds(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1e9).round() as u64
}

fn epoch_seconds_to_time(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos((seconds * 1e9).round() as i64)
}

fn assemble_node(
    cpu: Option<(u64, DateTime<Utc>)>,
    memory: Option<u64>,
) -> Option<MetricsPoint> {
    let (cumulative_cpu_used, timestamp) = cpu?;
    let memory_usage = memory?;
    if cumulative_cpu_used == 0 || memory_usage == 0 || timestamp.timestamp_millis() == 0 {
        return None;
    }
    Some(MetricsPoint {
        start_time: None,
        timestamp,
        cumulative_cpu_used,
        memory_usage,
    })
}

fn assemble_container(series: ContainerSeries) -> Option<MetricsPoint> {
    let (cumulative_cpu_used, timestamp) = series.cpu?;
    let memory_usage = series.memory?;
    if cumulative_cpu_used == 0 || memory_usage == 0 {
        return None;
    }
    Some(MetricsPoint {
        start_time: series.start_time,
        timestamp,
        cumulative_cpu_used,
        memory_usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn decodes_all_five_series() {
        let body = "\
# TYPE node_cpu_usage_seconds_total counter
node_cpu_usage_seconds_total 10 1700000010000
# TYPE node_memory_working_set_bytes gauge
node_memory_working_set_bytes 125829120 1700000010000
# TYPE container_cpu_usage_seconds_total counter
container_cpu_usage_seconds_total{container=\"c1\",namespace=\"ns1\",pod=\"pod1\"} 1.5 1700000010000
# TYPE container_memory_working_set_bytes gauge
container_memory_working_set_bytes{container=\"c1\",namespace=\"ns1\",pod=\"pod1\"} 4194304 1700000010000
# TYPE container_start_time_seconds gauge
container_start_time_seconds{container=\"c1\",namespace=\"ns1\",pod=\"pod1\"} 1699999900
";
        let batch = decode_resource(body, "node1", default_time()).unwrap();

        let node = &batch.nodes["node1"];
        assert_eq!(node.cumulative_cpu_used, 10_000_000_000);
        assert_eq!(node.memory_usage, 125_829_120);
        assert_eq!(
            node.timestamp,
            DateTime::from_timestamp_millis(1_700_000_010_000).unwrap()
        );

        let pod = &batch.pods[&PodRef::new("ns1", "pod1")];
        let c1 = &pod.containers["c1"];
        assert_eq!(c1.cumulative_cpu_used, 1_500_000_000);
        assert_eq!(c1.memory_usage, 4_194_304);
        assert_eq!(
            c1.start_time.unwrap(),
            DateTime::from_timestamp(1_699_999_900, 0).unwrap()
        );
    }

    #[test]
    fn samples_without_timestamp_use_the_default() {
        let body = "\
node_cpu_usage_seconds_total 10
node_memory_working_set_bytes 1024
";
        let batch = decode_resource(body, "node1", default_time()).unwrap();
        assert_eq!(batch.nodes["node1"].timestamp, default_time());
    }

    #[test]
    fn zero_container_cpu_drops_the_pod() {
        let body = "\
container_cpu_usage_seconds_total{container=\"c1\",namespace=\"ns1\",pod=\"pod1\"} 0 1700000010000
container_memory_working_set_bytes{container=\"c1\",namespace=\"ns1\",pod=\"pod1\"} 4194304 1700000010000
";
        let batch = decode_resource(body, "node1", default_time()).unwrap();
        assert!(batch.pods.is_empty());
    }

    #[test]
    fn zero_node_memory_drops_the_node_point() {
        let body = "\
node_cpu_usage_seconds_total 10 1700000010000
node_memory_working_set_bytes 0 1700000010000
";
        let batch = decode_resource(body, "node1", default_time()).unwrap();
        assert!(batch.nodes.is_empty());
    }

    #[test]
    fn unknown_series_are_ignored() {
        let body = "\
some_other_metric 42
node_cpu_usage_seconds_total 10 1700000010000
node_memory_working_set_bytes 1024 1700000010000
";
        let batch = decode_resource(body, "node1", default_time()).unwrap();
        assert_eq!(batch.nodes.len(), 1);
    }
}
