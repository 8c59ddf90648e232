//! HTTP route definitions and handlers.
//!
//! The binary only serves health and metrics endpoints; host applications
//! bring their own routes and wrap them with [`crate::middleware::observed`].

mod health_routes;
mod metrics_routes;

use std::sync::Arc;

use crate::middleware::{observed, RequestObserver};
use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
///
/// Every request, including unmatched ones, passes through the observer.
pub fn create_router(state: AppState, observer: Arc<RequestObserver>) -> Router {
    let router = Router::new()
        .merge(health_routes::routes())
        .merge(metrics_routes::routes());
    observed(router, observer).with_state(state)
}
