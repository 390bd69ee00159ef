pub mod kube_client;
pub mod kubelet;
pub mod lister;
pub mod resolver;
