use tracing::{debug, error};

use crate::app_state::AppState;

/// One tick: scrape every node, then publish the batch to the store. Scrape
/// errors are logged and the partial batch is stored anyway; a subject that
/// failed this cycle simply reappears once it produces clean points again.
pub async fn run(state: &AppState) {
    let started = state.clock.now();
    state.health.record_tick_start(started);

    let outcome = state.scraper.scrape().await;
    for err in &outcome.errors {
        error!(error = %err, "scrape failure");
    }

    state.store.store(&outcome.batch);
    debug!(
        nodes = outcome.batch.nodes.len(),
        pods = outcome.batch.pods.len(),
        errors = outcome.errors.len(),
        elapsed_ms = (state.clock.now() - started).num_milliseconds(),
        "scrape tick complete"
    );
}
