use std::sync::Arc;

use anyhow::Result;

use crate::core::client::kube_client::build_kube_client;
use crate::core::client::kubelet::{AgentClient, KubeletClient};
use crate::core::client::lister::{KubeNodeLister, KubePodLister, NodeLister, PodLister};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::scrape::Scraper;
use crate::core::storage::MetricsStore;
use crate::core::telemetry::Telemetry;
use crate::domain::system::health_service::SchedulerHealth;

/// Everything the API handlers and the scheduler share. All fields are
/// cheap-to-clone handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<MetricsStore>,
    pub scraper: Arc<Scraper>,
    pub nodes: Arc<dyn NodeLister>,
    pub pods: Arc<dyn PodLister>,
    pub health: Arc<SchedulerHealth>,
    pub telemetry: Arc<Telemetry>,
    pub clock: Arc<dyn Clock>,
}

pub async fn build_app_state(config: Config) -> Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let telemetry = Telemetry::new();

    let kube = build_kube_client().await?;
    let nodes: Arc<dyn NodeLister> = Arc::new(KubeNodeLister::new(kube.clone()));
    let pods: Arc<dyn PodLister> = Arc::new(KubePodLister::new(kube));

    let agent: Arc<dyn AgentClient> = Arc::new(KubeletClient::new(&config, Arc::clone(&clock))?);
    let scraper = Arc::new(Scraper::new(
        Arc::clone(&nodes),
        agent,
        config.address_types.clone(),
        config.scrape_timeout,
        Arc::clone(&clock),
        Arc::clone(&telemetry),
    ));

    let store = Arc::new(MetricsStore::new(
        config.metric_resolution,
        Arc::clone(&clock),
        Arc::clone(&telemetry),
    ));
    let health = Arc::new(SchedulerHealth::new(config.metric_resolution));

    Ok(AppState {
        config: Arc::new(config),
        store,
        scraper,
        nodes,
        pods,
        health,
        telemetry,
        clock,
    })
}
