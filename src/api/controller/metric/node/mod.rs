use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::domain::metric::model::{NodeMetrics, NodeMetricsList};
use crate::domain::metric::node_service::{get_node_metrics, get_node_metrics_named};
use crate::errors::AppError;

pub struct NodeMetricsController;

impl NodeMetricsController {
    pub async fn list(
        State(state): State<AppState>,
    ) -> Result<Json<NodeMetricsList>, AppError> {
        get_node_metrics(&state.store, state.nodes.as_ref())
            .await
            .map(Json)
            .map_err(|err| AppError::K8sApiError(err.to_string()))
    }

    pub async fn get(
        State(state): State<AppState>,
        Path(name): Path<String>,
    ) -> Result<Json<NodeMetrics>, AppError> {
        let metrics = get_node_metrics_named(&state.store, state.nodes.as_ref(), &name)
            .await
            .map_err(|err| AppError::K8sApiError(err.to_string()))?;
        match metrics {
            Some(metrics) => Ok(Json(metrics)),
            None => Err(AppError::NotFound(format!("no metrics known for node {name}"))),
        }
    }
}
