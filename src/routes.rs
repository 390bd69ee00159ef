use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use crate::app_state::AppState;

/// Build the router: probes and telemetry at the root, the resource
/// metrics API group under its `/apis` prefix.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        // Probes and telemetry
        .merge(crate::api::routes::system_routes::system_routes())
        // Resource metrics API group
        .nest(
            "/apis/metrics.k8s.io/v1beta1",
            crate::api::routes::metrics_routes::metrics_routes(),
        )
        .fallback(handler_404)
        // The API is read-only; permissive CORS keeps dashboards simple
        .layer(CorsLayer::very_permissive())
}

/// Identify the service; probes live at /healthz, /livez, /readyz.
async fn root() -> &'static str {
    concat!("rustmetrics-core ", env!("CARGO_PKG_VERSION"))
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "no such resource; metrics are served under /apis/metrics.k8s.io/v1beta1",
    )
}
