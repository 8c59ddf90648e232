//! Local view of the counters in the same line protocol that is pushed.

use crate::metrics::{render_lines, render_samples};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use tracing::debug;

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Renders the current counters without resetting the latency windows,
/// so reading this endpoint never disturbs what the exporter pushes.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let host = state
        .sampler
        .sample()
        .map_err(|e| debug!(error = %e, "host sample unavailable"))
        .ok();
    let body = render_lines(&render_samples(
        &snapshot,
        host.as_ref(),
        &state.config.metrics.source,
    ));

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        body,
    )
}
