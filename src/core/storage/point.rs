use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

/// A single observation of a subject (node or container).
///
/// `cumulative_cpu_used` is a monotonic counter in nanocore-seconds since the
/// subject's process started; `memory_usage` is working-set bytes.
/// `start_time` is `None` when the agent did not report one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsPoint {
    pub start_time: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
    pub cumulative_cpu_used: u64,
    pub memory_usage: u64,
}

/// Identity of a pod within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Per-container observations of one pod. An empty map means the pod exists
/// but reported no container data this cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodMetricsPoint {
    pub containers: BTreeMap<String, MetricsPoint>,
}

/// The result of one scrape cycle. A missing key means "no data this cycle".
#[derive(Debug, Clone, Default)]
pub struct MetricsBatch {
    pub nodes: HashMap<String, MetricsPoint>,
    pub pods: HashMap<PodRef, PodMetricsPoint>,
}

impl MetricsBatch {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.pods.is_empty()
    }

    /// Merge another batch into this one by key union. The first occurrence
    /// of a node or pod key wins; later duplicates are logged and dropped.
    /// Returns the number of duplicate keys encountered.
    pub fn merge(&mut self, other: MetricsBatch) -> usize {
        let mut duplicates = 0;
        for (name, point) in other.nodes {
            if self.nodes.contains_key(&name) {
                tracing::warn!(node = %name, "duplicate node in scrape results, keeping the first");
                duplicates += 1;
                continue;
            }
            self.nodes.insert(name, point);
        }
        for (pod_ref, pod) in other.pods {
            if self.pods.contains_key(&pod_ref) {
                tracing::warn!(pod = %pod_ref, "duplicate pod in scrape results, keeping the first");
                duplicates += 1;
                continue;
            }
            self.pods.insert(pod_ref, pod);
        }
        duplicates
    }
}

/// Timestamp and rate window of a read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInfo {
    pub timestamp: DateTime<Utc>,
    pub window: TimeDelta,
}

/// CPU rate and memory usage of one subject, in core units. Conversion to
/// API quantities happens at the edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub cpu_nanocores: u64,
    pub memory_bytes: u64,
}

/// One container's usage inside a pod read result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerUsage {
    pub name: String,
    pub usage: ResourceUsage,
}

/// Pod read result: effective time info plus per-container usage, ordered by
/// container name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodUsage {
    pub time_info: TimeInfo,
    pub containers: Vec<ContainerUsage>,
}

/// True when the two points belong to the same process instance, as far as
/// the available start times can tell.
fn same_instance(a: &MetricsPoint, b: &MetricsPoint) -> bool {
    match (a.start_time, b.start_time) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

fn is_restart(new: &MetricsPoint, last: &MetricsPoint) -> bool {
    matches!((new.start_time, last.start_time), (Some(n), Some(l)) if n > l)
}

/// Merge one incoming point against the stored `(last, prev)` pair of the
/// same subject, returning the pair to publish for the next cycle.
///
/// Rules, in order:
/// 1. no stored `last`: the new point stands alone;
/// 2. the new point advances time: on restart (`start_time` moved forward),
///    counter reset, or a start-time mismatch the old pair is unusable and
///    `prev` is dropped; otherwise the old `last` becomes `prev`;
/// 3. a late sample strictly between `prev` and `last` replaces `last`,
///    keeping the oldest valid anchor;
/// 4. anything else is stale or a duplicate timestamp: the stored pair is
///    carried forward unchanged.
pub(super) fn merge_point(
    old_last: Option<&MetricsPoint>,
    old_prev: Option<&MetricsPoint>,
    new: &MetricsPoint,
) -> (MetricsPoint, Option<MetricsPoint>) {
    let Some(last) = old_last else {
        return (new.clone(), None);
    };

    if new.timestamp > last.timestamp {
        if is_restart(new, last)
            || new.cumulative_cpu_used < last.cumulative_cpu_used
            || !same_instance(new, last)
        {
            return (new.clone(), None);
        }
        return (new.clone(), Some(last.clone()));
    }

    if let Some(prev) = old_prev {
        if prev.timestamp < new.timestamp
            && new.timestamp < last.timestamp
            && same_instance(new, prev)
            && new.cumulative_cpu_used >= prev.cumulative_cpu_used
        {
            return (new.clone(), Some(prev.clone()));
        }
    }

    (last.clone(), old_prev.cloned())
}

/// Derive the CPU rate and memory usage from a valid `(last, prev)` pair.
///
/// Rate is `Δcounter × 1e9 / Δt_ns`, i.e. nanocore-seconds per second
/// expressed in nanocores. Returns `None` when the pair violates the
/// ordering or monotonicity invariants.
pub(super) fn resource_usage(last: &MetricsPoint, prev: &MetricsPoint) -> Option<ResourceUsage> {
    let window_ns = (last.timestamp - prev.timestamp).num_nanoseconds()?;
    if window_ns <= 0 {
        return None;
    }
    let delta = last.cumulative_cpu_used.checked_sub(prev.cumulative_cpu_used)?;
    let cpu = (u128::from(delta) * 1_000_000_000u128 / window_ns as u128) as u64;
    Some(ResourceUsage {
        cpu_nanocores: cpu,
        memory_bytes: last.memory_usage,
    })
}
