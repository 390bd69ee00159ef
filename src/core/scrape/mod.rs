use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::client::kubelet::{AgentClient, AgentError, NodeTarget};
use crate::core::client::lister::NodeLister;
use crate::core::client::resolver::{resolve_address, AddressType};
use crate::core::clock::Clock;
use crate::core::storage::MetricsBatch;
use crate::core::telemetry::{ReasonLabels, Telemetry};

/// Cap on the artificial fan-out stagger, and its per-node share. The sleep
/// smooths the outbound burst against the agents without eating into the
/// scrape deadline at scale.
const STAGGER_PER_NODE_MS: u64 = 8;
const STAGGER_MAX_MS: u64 = 4000;

/// One per-cycle failure. The batch that accompanies these errors is partial
/// but still worth storing.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("listing nodes: {0}")]
    NodeList(String),
    #[error("node {node}: no address matched the configured priority list")]
    Unresolvable { node: String },
    #[error("node {node}: {source}")]
    Node { node: String, source: AgentError },
}

impl ScrapeError {
    fn reason(&self) -> &'static str {
        match self {
            ScrapeError::NodeList(_) => "node_list",
            ScrapeError::Unresolvable { .. } => "unresolvable",
            ScrapeError::Node { source, .. } => source.reason(),
        }
    }
}

/// Result of one scrape cycle: the merged batch plus every per-node failure.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub batch: MetricsBatch,
    pub errors: Vec<ScrapeError>,
}

/// Fans one scrape cycle out to every node under a bounded deadline.
pub struct Scraper {
    nodes: Arc<dyn NodeLister>,
    agent: Arc<dyn AgentClient>,
    address_types: Vec<AddressType>,
    scrape_timeout: Duration,
    clock: Arc<dyn Clock>,
    telemetry: Arc<Telemetry>,
}

impl Scraper {
    pub fn new(
        nodes: Arc<dyn NodeLister>,
        agent: Arc<dyn AgentClient>,
        address_types: Vec<AddressType>,
        scrape_timeout: Duration,
        clock: Arc<dyn Clock>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            nodes,
            agent,
            address_types,
            scrape_timeout,
            clock,
            telemetry,
        }
    }

    /// Scrape every resolvable node concurrently and merge the results.
    ///
    /// All per-node tasks live in a `JoinSet` owned by this call, so dropping
    /// the returned future aborts any outstanding agent calls. Every task
    /// yields exactly one result; the collector drains them all.
    pub async fn scrape(&self) -> ScrapeOutcome {
        let started = self.clock.now();
        let mut outcome = ScrapeOutcome::default();

        let nodes = match self.nodes.list().await {
            Ok(nodes) => nodes,
            Err(err) => {
                outcome.errors.push(ScrapeError::NodeList(err.to_string()));
                self.record(&outcome, started);
                return outcome;
            }
        };
        if nodes.is_empty() {
            self.record(&outcome, started);
            return outcome;
        }

        let delay_ms = (STAGGER_PER_NODE_MS * nodes.len() as u64).min(STAGGER_MAX_MS);
        let mut tasks = JoinSet::new();
        let mut spawned = 0usize;

        for node in nodes {
            let address = match resolve_address(&node.addresses, &self.address_types) {
                Ok(address) => address.to_string(),
                Err(_) => {
                    outcome
                        .errors
                        .push(ScrapeError::Unresolvable { node: node.name });
                    continue;
                }
            };
            let target = NodeTarget {
                name: node.name,
                address,
                node_status_port: node.kubelet_port,
            };
            let agent = Arc::clone(&self.agent);
            let sleep_ms = rand::thread_rng().gen_range(0..delay_ms);
            let deadline = self
                .scrape_timeout
                .saturating_sub(Duration::from_millis(sleep_ms));
            spawned += 1;
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                let result = match tokio::time::timeout(deadline, agent.fetch(&target)).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout),
                };
                (target.name, result)
            });
        }
        debug!(nodes = spawned, delay_ms, "scraping metrics from nodes");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(batch))) => {
                    self.telemetry.scraped_nodes.inc();
                    let duplicates = outcome.batch.merge(batch);
                    if duplicates > 0 {
                        self.telemetry.duplicate_subjects.inc_by(duplicates as u64);
                    }
                }
                Ok((node, Err(source))) => {
                    outcome.errors.push(ScrapeError::Node { node, source });
                }
                Err(err) => {
                    // A panicked task still counts as a drained slot.
                    warn!(error = %err, "scrape task failed to join");
                }
            }
        }

        self.record(&outcome, started);
        outcome
    }

    fn record(&self, outcome: &ScrapeOutcome, started: chrono::DateTime<chrono::Utc>) {
        let elapsed = (self.clock.now() - started).num_milliseconds() as f64 / 1000.0;
        self.telemetry.scrape_duration_seconds.observe(elapsed);
        for error in &outcome.errors {
            self.telemetry
                .scrape_node_errors
                .get_or_create(&ReasonLabels::new(error.reason()))
                .inc();
        }
    }
}
