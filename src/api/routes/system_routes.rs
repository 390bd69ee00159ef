//! System routes (probes and telemetry at the server root)

use axum::{routing::get, Router};

use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(SystemController::healthz))
        .route("/livez", get(SystemController::livez))
        .route("/readyz", get(SystemController::readyz))
        .route("/metrics", get(SystemController::metrics))
}
