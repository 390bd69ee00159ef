use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rustmetrics_core::app_state::build_app_state;
use rustmetrics_core::core::config::Config;
use rustmetrics_core::routes::app_router;
use rustmetrics_core::scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let _log_guard = init_tracing(&config);

    let state = build_app_state(config.clone()).await?;

    // The scheduler owns the scrape/store loop; the server only reads.
    let scheduler = tokio::spawn(scheduler::run(state.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "serving resource metrics API");

    axum::serve(listener, app_router().with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving API")?;

    // Dropping the scheduler task aborts any in-flight scrape.
    scheduler.abort();
    info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rustmetrics.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
        return;
    }
    info!("shutdown signal received");
}
