use anyhow::Result;
use kube::Client;
use tracing::debug;

/// Creates a Kubernetes client for in-cluster or local development use.
/// `Client::try_default` picks up the service account token in-cluster and
/// the active kubeconfig context otherwise.
pub async fn build_kube_client() -> Result<Client> {
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");
    Ok(client)
}
