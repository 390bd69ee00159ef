use std::collections::HashMap;

use super::point::{merge_point, resource_usage, MetricsPoint, ResourceUsage, TimeInfo};

/// Two-point store for node subjects: the freshest accepted observation per
/// node plus the one before it from the same process instance.
#[derive(Debug, Default)]
pub(super) struct NodeStorage {
    last: HashMap<String, MetricsPoint>,
    prev: HashMap<String, MetricsPoint>,
}

impl NodeStorage {
    /// Build the next generation from the incoming batch. Nodes absent from
    /// the batch are dropped so stale subjects age out after one cycle.
    pub fn next(&self, points: &HashMap<String, MetricsPoint>) -> NodeStorage {
        let mut out = NodeStorage {
            last: HashMap::with_capacity(points.len()),
            prev: HashMap::with_capacity(points.len()),
        };
        for (name, new) in points {
            let (last, prev) = merge_point(self.last.get(name), self.prev.get(name), new);
            out.last.insert(name.clone(), last);
            if let Some(prev) = prev {
                out.prev.insert(name.clone(), prev);
            }
        }
        out
    }

    /// Positional lookup: one slot per requested name, `None` for unknown or
    /// not-yet-rate-capable nodes.
    pub fn metrics(&self, names: &[&str]) -> Vec<Option<(TimeInfo, ResourceUsage)>> {
        names.iter().map(|name| self.metrics_for(name)).collect()
    }

    fn metrics_for(&self, name: &str) -> Option<(TimeInfo, ResourceUsage)> {
        let last = self.last.get(name)?;
        let prev = self.prev.get(name)?;
        let usage = resource_usage(last, prev)?;
        Some((
            TimeInfo {
                timestamp: last.timestamp,
                window: last.timestamp - prev.timestamp,
            },
            usage,
        ))
    }

    /// At least one node holds a full pair, so at least one read can succeed.
    pub fn ready(&self) -> bool {
        self.prev.keys().any(|name| self.last.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::super::point::test_support::{at, point};
    use super::*;
    use chrono::TimeDelta;

    fn batch_of(entries: &[(&str, MetricsPoint)]) -> HashMap<String, MetricsPoint> {
        entries
            .iter()
            .map(|(n, p)| (n.to_string(), p.clone()))
            .collect()
    }

    #[test]
    fn two_cycles_yield_a_rate() {
        let storage = NodeStorage::default();
        let storage = storage.next(&batch_of(&[("node1", point(None, at(0), 10_000_000_000, 120 << 20))]));
        assert!(!storage.ready());
        assert_eq!(storage.metrics(&["node1"]), vec![None]);

        let storage = storage.next(&batch_of(&[("node1", point(None, at(10), 20_000_000_000, 120 << 20))]));
        assert!(storage.ready());
        let (time_info, usage) = storage.metrics(&["node1"])[0].unwrap();
        assert_eq!(time_info.timestamp, at(10));
        assert_eq!(time_info.window, TimeDelta::seconds(10));
        assert_eq!(usage.cpu_nanocores, 1_000_000_000);
        assert_eq!(usage.memory_bytes, 120 << 20);
    }

    #[test]
    fn counter_reset_empties_the_slot() {
        let storage = NodeStorage::default()
            .next(&batch_of(&[("node1", point(None, at(0), 10_000_000_000, 120 << 20))]))
            .next(&batch_of(&[("node1", point(None, at(10), 20_000_000_000, 120 << 20))]))
            .next(&batch_of(&[("node1", point(None, at(20), 5_000_000_000, 120 << 20))]));
        assert_eq!(storage.metrics(&["node1"]), vec![None]);
    }

    #[test]
    fn restart_empties_the_slot() {
        let storage = NodeStorage::default()
            .next(&batch_of(&[("node1", point(Some(at(-100)), at(0), 10_000_000_000, 1))]))
            .next(&batch_of(&[("node1", point(Some(at(-100)), at(10), 20_000_000_000, 1))]))
            .next(&batch_of(&[("node1", point(Some(at(15)), at(25), 1_000_000_000, 1))]));
        assert_eq!(storage.metrics(&["node1"]), vec![None]);
    }

    #[test]
    fn storing_the_same_batch_twice_promotes_nothing() {
        let batch = batch_of(&[("node1", point(None, at(0), 10, 1))]);
        let storage = NodeStorage::default().next(&batch).next(&batch);
        assert!(!storage.ready());
        assert_eq!(storage.metrics(&["node1"]), vec![None]);
    }

    #[test]
    fn absent_nodes_age_out() {
        let storage = NodeStorage::default()
            .next(&batch_of(&[("node1", point(None, at(0), 10, 1))]))
            .next(&batch_of(&[("node2", point(None, at(10), 10, 1))]));
        assert_eq!(storage.metrics(&["node1"]), vec![None]);
        assert!(storage.last.contains_key("node2"));
        assert!(!storage.last.contains_key("node1"));
    }

    #[test]
    fn missing_names_yield_empty_slots_in_order() {
        let storage = NodeStorage::default()
            .next(&batch_of(&[("node1", point(None, at(0), 10_000_000_000, 1))]))
            .next(&batch_of(&[("node1", point(None, at(10), 20_000_000_000, 1))]));
        let slots = storage.metrics(&["ghost", "node1"]);
        assert!(slots[0].is_none());
        assert!(slots[1].is_some());
    }
}
