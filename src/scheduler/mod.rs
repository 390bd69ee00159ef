pub mod tasks;

use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::app_state::AppState;

/// Periodic driver: one scrape-and-store tick every metric resolution.
///
/// A tick that overruns is allowed to finish; missed ticks are skipped, not
/// rescheduled, so the cadence stays anchored to the original schedule.
/// Dropping this future (on shutdown) aborts any in-flight scrape.
pub async fn run(state: AppState) {
    let resolution = state.config.metric_resolution;
    info!(resolution_secs = resolution.as_secs(), "starting scrape scheduler");

    let mut ticker = tokio::time::interval(resolution);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        tasks::collect::run(&state).await;
    }
}
