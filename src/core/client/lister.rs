//! Cluster-object listers. The scrape and read paths only ever see these
//! traits; the kube-backed implementations live here next to them.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeAddress, Pod};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

/// What the scraper needs to know about one node.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    pub name: String,
    pub addresses: Vec<NodeAddress>,
    /// Port advertised via the node's kubelet daemon endpoint, when any.
    pub kubelet_port: Option<i32>,
    pub labels: BTreeMap<String, String>,
}

/// What the pod read path needs to know about one pod.
#[derive(Debug, Clone, Default)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

#[async_trait]
pub trait NodeLister: Send + Sync {
    async fn list(&self) -> Result<Vec<NodeInfo>>;
}

#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<PodInfo>>;
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<PodInfo>>;
}

pub struct KubeNodeLister {
    client: Client,
}

impl KubeNodeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeLister for KubeNodeLister {
    async fn list(&self) -> Result<Vec<NodeInfo>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node_list = nodes.list(&ListParams::default()).await?;
        debug!("discovered {} node(s)", node_list.items.len());
        Ok(node_list.items.into_iter().map(node_info).collect())
    }
}

fn node_info(node: Node) -> NodeInfo {
    let status = node.status.unwrap_or_default();
    NodeInfo {
        name: node.metadata.name.unwrap_or_default(),
        addresses: status.addresses.unwrap_or_default(),
        kubelet_port: status
            .daemon_endpoints
            .and_then(|e| e.kubelet_endpoint)
            .map(|e| e.port),
        labels: node.metadata.labels.unwrap_or_default(),
    }
}

pub struct KubePodLister {
    client: Client,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: Option<&str>) -> Api<Pod> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<PodInfo>> {
        let pods = self.api(namespace).list(&ListParams::default()).await?;
        Ok(pods.items.into_iter().map(pod_info).collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<PodInfo>> {
        let pod = self.api(Some(namespace)).get_opt(name).await?;
        Ok(pod.map(pod_info))
    }
}

fn pod_info(pod: Pod) -> PodInfo {
    PodInfo {
        namespace: pod.metadata.namespace.unwrap_or_default(),
        name: pod.metadata.name.unwrap_or_default(),
        labels: pod.metadata.labels.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{DaemonEndpoint, NodeDaemonEndpoints, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn node_info_extracts_name_addresses_and_port() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("node1".to_string()),
                labels: Some([("zone".to_string(), "a".to_string())].into_iter().collect()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                addresses: Some(vec![NodeAddress {
                    type_: "InternalIP".to_string(),
                    address: "10.0.0.1".to_string(),
                }]),
                daemon_endpoints: Some(NodeDaemonEndpoints {
                    kubelet_endpoint: Some(DaemonEndpoint { port: 10250 }),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let info = node_info(node);
        assert_eq!(info.name, "node1");
        assert_eq!(info.addresses.len(), 1);
        assert_eq!(info.kubelet_port, Some(10250));
        assert_eq!(info.labels["zone"], "a");
    }

    #[test]
    fn node_info_tolerates_missing_status() {
        let info = node_info(Node::default());
        assert!(info.name.is_empty());
        assert!(info.addresses.is_empty());
        assert_eq!(info.kubelet_port, None);
    }
}
