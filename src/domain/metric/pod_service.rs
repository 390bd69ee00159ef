use anyhow::Result;

use crate::core::client::lister::{PodInfo, PodLister};
use crate::core::storage::{MetricsStore, PodRef};

use super::model::{PodMetrics, PodMetricsList};

/// Assemble metric objects for every pod known to the lister, optionally
/// restricted to one namespace. Pods that fail the all-or-nothing container
/// rule are absent from the list.
pub async fn get_pod_metrics(
    store: &MetricsStore,
    pods: &dyn PodLister,
    namespace: Option<&str>,
) -> Result<PodMetricsList> {
    let pods = pods.list(namespace).await?;
    let refs: Vec<PodRef> = pods
        .iter()
        .map(|p| PodRef::new(p.namespace.clone(), p.name.clone()))
        .collect();
    let slots = store.pod_metrics(&refs);

    let items = pods
        .iter()
        .zip(slots)
        .filter_map(|(pod, slot)| slot.map(|usage| to_pod_metrics(pod, usage)))
        .collect();
    Ok(PodMetricsList::new(items))
}

/// Single-pod lookup; `None` when the pod is unknown or not read-capable.
pub async fn get_pod_metrics_named(
    store: &MetricsStore,
    pods: &dyn PodLister,
    namespace: &str,
    name: &str,
) -> Result<Option<PodMetrics>> {
    let Some(pod) = pods.get(namespace, name).await? else {
        return Ok(None);
    };
    let slot = store
        .pod_metrics(&[PodRef::new(namespace, name)])
        .pop()
        .flatten();
    Ok(slot.map(|usage| to_pod_metrics(&pod, usage)))
}

fn to_pod_metrics(pod: &PodInfo, usage: crate::core::storage::PodUsage) -> PodMetrics {
    PodMetrics::new(
        &pod.namespace,
        &pod.name,
        &pod.labels,
        usage.time_info,
        usage.containers,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::core::clock::test_support::ManualClock;
    use crate::core::storage::point::test_support::{at, point};
    use crate::core::storage::{MetricsBatch, PodMetricsPoint};
    use crate::core::telemetry::Telemetry;

    struct FixedPods(Vec<PodInfo>);

    #[async_trait]
    impl PodLister for FixedPods {
        async fn list(&self, namespace: Option<&str>) -> Result<Vec<PodInfo>> {
            Ok(self
                .0
                .iter()
                .filter(|p| namespace.is_none_or(|ns| p.namespace == ns))
                .cloned()
                .collect())
        }

        async fn get(&self, namespace: &str, name: &str) -> Result<Option<PodInfo>> {
            Ok(self
                .0
                .iter()
                .find(|p| p.namespace == namespace && p.name == name)
                .cloned())
        }
    }

    fn pod_info(namespace: &str, name: &str) -> PodInfo {
        PodInfo {
            namespace: namespace.to_string(),
            name: name.to_string(),
            labels: [("app".to_string(), name.to_string())].into_iter().collect(),
        }
    }

    fn store_with_fresh_pod() -> MetricsStore {
        let store = MetricsStore::new(
            std::time::Duration::from_secs(60),
            Arc::new(ManualClock::new(at(60))),
            Telemetry::new(),
        );
        let mut batch = MetricsBatch::default();
        batch.pods.insert(
            PodRef::new("ns1", "pod1"),
            PodMetricsPoint {
                containers: [(
                    "c".to_string(),
                    point(Some(at(0)), at(15), 1_000_000_000, 4 << 20),
                )]
                .into_iter()
                .collect(),
            },
        );
        store.store(&batch);
        store
    }

    #[tokio::test]
    async fn list_returns_read_capable_pods_with_labels() {
        let lister = FixedPods(vec![pod_info("ns1", "pod1"), pod_info("ns2", "other")]);
        let list = get_pod_metrics(&store_with_fresh_pod(), &lister, None)
            .await
            .unwrap();
        assert_eq!(list.items.len(), 1);
        let item = &list.items[0];
        assert_eq!(item.metadata.namespace.as_deref(), Some("ns1"));
        assert_eq!(item.metadata.labels.as_ref().unwrap()["app"], "pod1");
        assert_eq!(item.window, "15s");
        assert_eq!(item.containers.len(), 1);
        assert_eq!(item.containers[0].usage.cpu.0, "66666666n");
        assert_eq!(item.containers[0].usage.memory.0, "4Mi");
    }

    #[tokio::test]
    async fn namespace_filter_is_applied_by_the_lister() {
        let lister = FixedPods(vec![pod_info("ns1", "pod1"), pod_info("ns2", "other")]);
        let list = get_pod_metrics(&store_with_fresh_pod(), &lister, Some("ns2"))
            .await
            .unwrap();
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn named_lookup_returns_none_for_unknown_pod() {
        let lister = FixedPods(vec![pod_info("ns1", "pod1")]);
        let store = store_with_fresh_pod();
        assert!(get_pod_metrics_named(&store, &lister, "ns1", "pod1")
            .await
            .unwrap()
            .is_some());
        assert!(get_pod_metrics_named(&store, &lister, "ns1", "ghost")
            .await
            .unwrap()
            .is_none());
    }
}
