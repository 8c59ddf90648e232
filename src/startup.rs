//! Application startup and server initialization.
//!
//! Builds the counter store, starts the exporter loop, and serves the
//! observed router until Ctrl-C.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ConfigV1;
use crate::metrics::{CounterStore, Exporter, HostSampler, HttpSink, SystemSampler};
use crate::middleware::RequestObserver;
use crate::routes;
use crate::state::AppState;

/// Initializes and runs the application server.
///
/// The exporter runs as a background task for as long as the server does
/// and is aborted once the server stops, so it never keeps the process alive.
///
/// # Errors
///
/// Returns an error if the metrics client cannot be built, the server fails
/// to bind to the configured address, or serving fails.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(CounterStore::new());
    let sampler: Arc<dyn HostSampler> = Arc::new(SystemSampler::new());
    let sink = Arc::new(HttpSink::new(&config.metrics)?);

    let exporter = Exporter::new(
        store.clone(),
        sampler.clone(),
        sink,
        config.metrics.source.clone(),
        config.metrics.period(),
    )
    .spawn();
    info!(
        url = config.metrics.url.as_str(),
        source = config.metrics.source.as_str(),
        period_in_ms = config.metrics.period_in_ms,
        "Started metrics exporter"
    );

    let observer = Arc::new(RequestObserver::new(store.clone(), &config.metrics));
    let state = AppState {
        config: config.clone(),
        store,
        sampler,
    };
    let app = routes::create_router(state, observer);

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    exporter.abort();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
