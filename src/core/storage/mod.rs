pub mod point;

mod node;
mod pod;

use std::sync::{Arc, RwLock};

use chrono::TimeDelta;
use tracing::debug;

use crate::core::clock::Clock;
use crate::core::telemetry::Telemetry;

use self::node::NodeStorage;
use self::pod::PodStorage;
pub use self::point::{
    ContainerUsage, MetricsBatch, MetricsPoint, PodMetricsPoint, PodRef, PodUsage, ResourceUsage,
    TimeInfo,
};

/// In-memory two-point store for the freshest scrape results.
///
/// `store` is called once per scrape cycle by the tick loop; reads come from
/// the API handlers. One reader-writer lock linearizes `store` against
/// concurrent reads; the replacement generation is built outside the lock.
pub struct MetricsStore {
    inner: RwLock<Inner>,
    resolution: TimeDelta,
    clock: Arc<dyn Clock>,
    telemetry: Arc<Telemetry>,
}

#[derive(Default)]
struct Inner {
    nodes: NodeStorage,
    pods: PodStorage,
}

impl MetricsStore {
    pub fn new(
        resolution: std::time::Duration,
        clock: Arc<dyn Clock>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            resolution: TimeDelta::from_std(resolution)
                .unwrap_or_else(|_| TimeDelta::seconds(60)),
            clock,
            telemetry,
        }
    }

    /// Replace the stored state with the merge of the incoming batch against
    /// the current generation. Violations of the ordering rules silently
    /// omit the subject; `store` itself never fails.
    pub fn store(&self, batch: &MetricsBatch) {
        let next = {
            let inner = self.inner.read().expect("metrics store lock poisoned");
            Inner {
                nodes: inner.nodes.next(&batch.nodes),
                pods: inner.pods.next(&batch.pods, self.resolution),
            }
        };
        *self.inner.write().expect("metrics store lock poisoned") = next;
        debug!(
            nodes = batch.nodes.len(),
            pods = batch.pods.len(),
            "stored scrape batch"
        );
    }

    /// Positional node lookup; unknown or not-yet-rate-capable nodes yield
    /// `None` slots.
    pub fn node_metrics(&self, names: &[&str]) -> Vec<Option<(TimeInfo, ResourceUsage)>> {
        let results = {
            let inner = self.inner.read().expect("metrics store lock poisoned");
            inner.nodes.metrics(names)
        };
        self.observe_freshness(results.iter().filter_map(|r| r.as_ref().map(|(t, _)| t)));
        results
    }

    /// Positional pod lookup with the all-or-nothing container rule.
    pub fn pod_metrics(&self, pods: &[PodRef]) -> Vec<Option<PodUsage>> {
        let results = {
            let inner = self.inner.read().expect("metrics store lock poisoned");
            inner.pods.metrics(pods)
        };
        self.observe_freshness(results.iter().filter_map(|r| r.as_ref().map(|u| &u.time_info)));
        results
    }

    /// True once at least one node has two valid points.
    pub fn ready(&self) -> bool {
        self.inner
            .read()
            .expect("metrics store lock poisoned")
            .nodes
            .ready()
    }

    fn observe_freshness<'a>(&self, time_infos: impl Iterator<Item = &'a TimeInfo>) {
        let now = self.clock.now();
        for time_info in time_infos {
            let age = (now - time_info.timestamp).num_milliseconds() as f64 / 1000.0;
            self.telemetry.metric_freshness_seconds.observe(age);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::point::test_support::{at, point};
    use super::*;
    use crate::core::clock::test_support::ManualClock;

    fn test_store() -> MetricsStore {
        MetricsStore::new(
            std::time::Duration::from_secs(60),
            Arc::new(ManualClock::new(at(120))),
            Telemetry::new(),
        )
    }

    fn node_batch(entries: &[(&str, MetricsPoint)]) -> MetricsBatch {
        MetricsBatch {
            nodes: entries
                .iter()
                .map(|(n, p)| (n.to_string(), p.clone()))
                .collect(),
            pods: Default::default(),
        }
    }

    #[test]
    fn readiness_requires_two_points_on_some_node() {
        let store = test_store();
        assert!(!store.ready());
        store.store(&node_batch(&[("node1", point(None, at(0), 10_000_000_000, 1))]));
        assert!(!store.ready());
        store.store(&node_batch(&[("node1", point(None, at(10), 20_000_000_000, 1))]));
        assert!(store.ready());
    }

    #[test]
    fn node_metrics_are_positional() {
        let store = test_store();
        store.store(&node_batch(&[("node1", point(None, at(0), 10_000_000_000, 1))]));
        store.store(&node_batch(&[("node1", point(None, at(10), 20_000_000_000, 1))]));
        let slots = store.node_metrics(&["missing", "node1"]);
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_none());
        let (time_info, usage) = slots[1].unwrap();
        assert_eq!(time_info.timestamp, at(10));
        assert_eq!(usage.cpu_nanocores, 1_000_000_000);
    }

    #[test]
    fn pod_metrics_flow_through_the_store() {
        let store = test_store();
        let pod = PodRef::new("ns1", "pod1");
        let mut batch = MetricsBatch::default();
        batch.pods.insert(
            pod.clone(),
            PodMetricsPoint {
                containers: [("c".to_string(), point(Some(at(0)), at(15), 1_000_000_000, 4 << 20))]
                    .into_iter()
                    .collect(),
            },
        );
        store.store(&batch);
        let slots = store.pod_metrics(std::slice::from_ref(&pod));
        let usage = slots[0].clone().unwrap();
        assert_eq!(usage.containers[0].name, "c");
        assert_eq!(usage.containers[0].usage.memory_bytes, 4 << 20);
    }
}
