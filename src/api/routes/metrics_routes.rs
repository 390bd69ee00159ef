//! Metrics routes (served under /apis/metrics.k8s.io/v1beta1)

use axum::{routing::get, Router};

use crate::api::controller::metric::node::NodeMetricsController;
use crate::api::controller::metric::pod::PodMetricsController;
use crate::app_state::AppState;

/// Build the router for the metrics API group
pub fn metrics_routes() -> Router<AppState> {
    Router::new()
        // Nodes
        .route("/nodes", get(NodeMetricsController::list))
        .route("/nodes/{name}", get(NodeMetricsController::get))
        // Pods
        .route("/pods", get(PodMetricsController::list_all))
        .route(
            "/namespaces/{namespace}/pods",
            get(PodMetricsController::list_namespaced),
        )
        .route(
            "/namespaces/{namespace}/pods/{name}",
            get(PodMetricsController::get),
        )
}
