use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::storage::{MetricsBatch, MetricsPoint, PodMetricsPoint, PodRef};

use super::summary_dto::{ContainerStats, NodeStats, PodStats, Summary};

/// Extract node and container points from one summary document.
///
/// A container missing any required field poisons its whole pod; a node
/// missing a field loses only the node point. Zero usage on either resource
/// means the subject is still initializing and would publish synthetic
/// zeros, so it is treated the same as a missing field.
pub fn decode_summary(summary: &Summary) -> MetricsBatch {
    let mut batch = MetricsBatch::default();

    match node_point(&summary.node) {
        Some(point) => {
            batch.nodes.insert(summary.node.node_name.clone(), point);
        }
        None => debug!(
            node = %summary.node.node_name,
            "dropping node point with missing or zero cpu/memory fields"
        ),
    }

    for pod in &summary.pods {
        let pod_ref = PodRef::new(pod.pod_ref.namespace.clone(), pod.pod_ref.name.clone());
        match pod_points(pod) {
            Some(points) => {
                batch.pods.insert(pod_ref, points);
            }
            None => debug!(pod = %pod_ref, "dropping pod with incomplete container stats"),
        }
    }

    batch
}

fn node_point(node: &NodeStats) -> Option<MetricsPoint> {
    let cpu = node.cpu.as_ref()?;
    let memory = node.memory.as_ref()?;
    let timestamp = nonzero_time(cpu.time?)?;
    let cumulative_cpu_used = nonzero(cpu.usage_core_nano_seconds?)?;
    let memory_usage = nonzero(memory.working_set_bytes?)?;
    Some(MetricsPoint {
        start_time: node.start_time,
        timestamp,
        cumulative_cpu_used,
        memory_usage,
    })
}

fn pod_points(pod: &PodStats) -> Option<PodMetricsPoint> {
    let mut points = PodMetricsPoint::default();
    for container in &pod.containers {
        let point = container_point(container)?;
        points.containers.insert(container.name.clone(), point);
    }
    Some(points)
}

fn container_point(container: &ContainerStats) -> Option<MetricsPoint> {
    let start_time = nonzero_time(container.start_time?)?;
    let cpu = container.cpu.as_ref()?;
    let memory = container.memory.as_ref()?;
    let timestamp = nonzero_time(cpu.time?)?;
    let cumulative_cpu_used = nonzero(cpu.usage_core_nano_seconds?)?;
    let memory_usage = nonzero(memory.working_set_bytes?)?;
    Some(MetricsPoint {
        start_time: Some(start_time),
        timestamp,
        cumulative_cpu_used,
        memory_usage,
    })
}

fn nonzero(value: u64) -> Option<u64> {
    (value != 0).then_some(value)
}

fn nonzero_time(time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (time.timestamp_millis() != 0).then_some(time)
}
