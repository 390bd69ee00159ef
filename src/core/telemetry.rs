use std::sync::Arc;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabels {
    pub reason: String,
}

impl ReasonLabels {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Operational counters and histograms for the scrape pipeline, exposed on
/// the `/metrics` endpoint. Handed around explicitly instead of living in
/// module-level globals.
pub struct Telemetry {
    registry: Registry,
    pub scrape_duration_seconds: Histogram,
    pub scrape_node_errors: Family<ReasonLabels, Counter>,
    pub scraped_nodes: Counter,
    pub duplicate_subjects: Counter,
    pub metric_freshness_seconds: Histogram,
}

impl Telemetry {
    pub fn new() -> Arc<Self> {
        let mut registry = Registry::with_prefix("rustmetrics");

        let scrape_duration_seconds = Histogram::new(exponential_buckets(0.25, 2.0, 8));
        registry.register(
            "scrape_duration_seconds",
            "Duration of one full scrape cycle",
            scrape_duration_seconds.clone(),
        );

        let scrape_node_errors = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "scrape_node_errors",
            "Per-node scrape failures by reason",
            scrape_node_errors.clone(),
        );

        let scraped_nodes = Counter::default();
        registry.register(
            "scraped_nodes",
            "Nodes scraped successfully",
            scraped_nodes.clone(),
        );

        let duplicate_subjects = Counter::default();
        registry.register(
            "duplicate_subjects",
            "Duplicate node or pod identities dropped during batch merge",
            duplicate_subjects.clone(),
        );

        let metric_freshness_seconds = Histogram::new(exponential_buckets(1.0, 2.0, 10));
        registry.register(
            "metric_freshness_seconds",
            "Age of the freshest stored point at read time",
            metric_freshness_seconds.clone(),
        );

        Arc::new(Self {
            registry,
            scrape_duration_seconds,
            scrape_node_errors,
            scraped_nodes,
            duplicate_subjects,
            metric_freshness_seconds,
        })
    }

    /// Render the registry in the OpenMetrics text format.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Err(err) = prometheus_client::encoding::text::encode(&mut out, &self.registry) {
            tracing::error!(error = %err, "failed to encode telemetry registry");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_registered_series() {
        let telemetry = Telemetry::new();
        telemetry.scraped_nodes.inc();
        telemetry
            .scrape_node_errors
            .get_or_create(&ReasonLabels::new("timeout"))
            .inc();
        let text = telemetry.encode();
        assert!(text.contains("rustmetrics_scraped_nodes_total"));
        assert!(text.contains("reason=\"timeout\""));
    }
}
