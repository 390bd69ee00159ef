use anyhow::Result;

use crate::core::client::lister::NodeLister;
use crate::core::storage::MetricsStore;

use super::model::{NodeMetrics, NodeMetricsList};

/// Assemble metric objects for every known node. Nodes without two
/// consistent points this cycle are simply absent from the list; they
/// reappear once the store accepts a fresh pair.
pub async fn get_node_metrics(
    store: &MetricsStore,
    nodes: &dyn NodeLister,
) -> Result<NodeMetricsList> {
    let nodes = nodes.list().await?;
    let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    let slots = store.node_metrics(&names);

    let items = nodes
        .iter()
        .zip(slots)
        .filter_map(|(node, slot)| {
            slot.map(|(time_info, usage)| {
                NodeMetrics::new(&node.name, &node.labels, time_info, usage)
            })
        })
        .collect();
    Ok(NodeMetricsList::new(items))
}

/// Single-node lookup; `None` when the node is unknown or not yet
/// rate-capable.
pub async fn get_node_metrics_named(
    store: &MetricsStore,
    nodes: &dyn NodeLister,
    name: &str,
) -> Result<Option<NodeMetrics>> {
    let nodes = nodes.list().await?;
    let Some(node) = nodes.iter().find(|n| n.name == name) else {
        return Ok(None);
    };
    let slot = store.node_metrics(&[name]).pop().flatten();
    Ok(slot.map(|(time_info, usage)| NodeMetrics::new(&node.name, &node.labels, time_info, usage)))
}
