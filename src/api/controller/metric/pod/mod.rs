use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::domain::metric::model::{PodMetrics, PodMetricsList};
use crate::domain::metric::pod_service::{get_pod_metrics, get_pod_metrics_named};
use crate::errors::AppError;

pub struct PodMetricsController;

impl PodMetricsController {
    pub async fn list_all(
        State(state): State<AppState>,
    ) -> Result<Json<PodMetricsList>, AppError> {
        get_pod_metrics(&state.store, state.pods.as_ref(), None)
            .await
            .map(Json)
            .map_err(|err| AppError::K8sApiError(err.to_string()))
    }

    pub async fn list_namespaced(
        State(state): State<AppState>,
        Path(namespace): Path<String>,
    ) -> Result<Json<PodMetricsList>, AppError> {
        get_pod_metrics(&state.store, state.pods.as_ref(), Some(&namespace))
            .await
            .map(Json)
            .map_err(|err| AppError::K8sApiError(err.to_string()))
    }

    pub async fn get(
        State(state): State<AppState>,
        Path((namespace, name)): Path<(String, String)>,
    ) -> Result<Json<PodMetrics>, AppError> {
        let metrics =
            get_pod_metrics_named(&state.store, state.pods.as_ref(), &namespace, &name)
                .await
                .map_err(|err| AppError::K8sApiError(err.to_string()))?;
        match metrics {
            Some(metrics) => Ok(Json(metrics)),
            None => Err(AppError::NotFound(format!(
                "no metrics known for pod {namespace}/{name}"
            ))),
        }
    }
}
