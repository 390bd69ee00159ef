//! System controller: liveness, readiness, and telemetry endpoints.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::app_state::AppState;

pub struct SystemController;

impl SystemController {
    /// Process liveness: answers as long as the server runs.
    pub async fn healthz() -> &'static str {
        "ok"
    }

    /// Tick-loop liveness: fails when the scheduler stops stamping ticks.
    pub async fn livez(State(state): State<AppState>) -> impl IntoResponse {
        if state.health.alive(state.clock.now()) {
            (StatusCode::OK, "ok")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "tick loop is stalled")
        }
    }

    /// Readiness: fails until the store can answer at least one node read.
    pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
        if state.store.ready() {
            (StatusCode::OK, "ok")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "no node has two stored points yet")
        }
    }

    /// Operational telemetry in the OpenMetrics text format.
    pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
        (
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            state.telemetry.encode(),
        )
    }
}
