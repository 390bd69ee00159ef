use std::collections::{BTreeMap, HashMap};

use chrono::TimeDelta;
use tracing::debug;

use super::point::{
    merge_point, resource_usage, ContainerUsage, MetricsPoint, PodMetricsPoint, PodRef, PodUsage,
    TimeInfo,
};

/// Minimum container age for the fresh-container fast path. Anything younger
/// has too little signal for a meaningful rate.
const FRESH_CONTAINER_MIN_AGE: TimeDelta = TimeDelta::seconds(10);

/// Two-point store for container subjects, keyed by pod and container name.
#[derive(Debug, Default)]
pub(super) struct PodStorage {
    last: HashMap<PodRef, BTreeMap<String, MetricsPoint>>,
    prev: HashMap<PodRef, BTreeMap<String, MetricsPoint>>,
}

impl PodStorage {
    /// Build the next generation from the incoming batch. Pods absent from
    /// the batch are dropped, same as nodes.
    ///
    /// Containers observed within `[10s, resolution)` of their start get a
    /// synthesized zero-CPU anchor at `start_time`, so the first real
    /// measurement already yields a rate.
    pub fn next(
        &self,
        pods: &HashMap<PodRef, PodMetricsPoint>,
        resolution: TimeDelta,
    ) -> PodStorage {
        let mut out = PodStorage {
            last: HashMap::with_capacity(pods.len()),
            prev: HashMap::with_capacity(pods.len()),
        };
        for (pod_ref, pod) in pods {
            let old_last = self.last.get(pod_ref);
            let old_prev = self.prev.get(pod_ref);
            let mut last_containers = BTreeMap::new();
            let mut prev_containers = BTreeMap::new();

            for (name, new) in &pod.containers {
                if new.start_time.is_some_and(|start| start > new.timestamp) {
                    debug!(pod = %pod_ref, container = %name,
                        "rejecting container observation that predates its start time");
                    continue;
                }
                let (last, prev) = merge_point(
                    old_last.and_then(|m| m.get(name)),
                    old_prev.and_then(|m| m.get(name)),
                    new,
                );
                let prev = prev.or_else(|| synthesize_fresh_anchor(&last, resolution));
                if let Some(prev) = prev {
                    prev_containers.insert(name.clone(), prev);
                }
                last_containers.insert(name.clone(), last);
            }

            out.last.insert(pod_ref.clone(), last_containers);
            if !prev_containers.is_empty() {
                out.prev.insert(pod_ref.clone(), prev_containers);
            }
        }
        out
    }

    /// Positional lookup. A pod yields a result only when every container in
    /// `last` also holds a valid `prev`; the reported window comes from the
    /// container with the earliest `last` timestamp.
    pub fn metrics(&self, pods: &[PodRef]) -> Vec<Option<PodUsage>> {
        pods.iter().map(|pod_ref| self.metrics_for(pod_ref)).collect()
    }

    fn metrics_for(&self, pod_ref: &PodRef) -> Option<PodUsage> {
        let last = self.last.get(pod_ref)?;
        if last.is_empty() {
            return None;
        }
        let prev = self.prev.get(pod_ref)?;

        let mut containers = Vec::with_capacity(last.len());
        let mut earliest: Option<(&MetricsPoint, &MetricsPoint)> = None;
        for (name, last_point) in last {
            let prev_point = prev.get(name)?;
            let usage = resource_usage(last_point, prev_point)?;
            containers.push(ContainerUsage {
                name: name.clone(),
                usage,
            });
            if earliest.is_none_or(|(l, _)| last_point.timestamp < l.timestamp) {
                earliest = Some((last_point, prev_point));
            }
        }

        let (last_point, prev_point) = earliest?;
        Some(PodUsage {
            time_info: TimeInfo {
                timestamp: last_point.timestamp,
                window: last_point.timestamp - prev_point.timestamp,
            },
            containers,
        })
    }
}

fn synthesize_fresh_anchor(last: &MetricsPoint, resolution: TimeDelta) -> Option<MetricsPoint> {
    let start = last.start_time?;
    let age = last.timestamp - start;
    if age < FRESH_CONTAINER_MIN_AGE || age >= resolution {
        return None;
    }
    Some(MetricsPoint {
        start_time: Some(start),
        timestamp: start,
        cumulative_cpu_used: 0,
        memory_usage: last.memory_usage,
    })
}
