//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! configuration, the counter store, and the host sampler.

use crate::config::ConfigV1;
use crate::metrics::{CounterStore, HostSampler};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Counters written by the observer middleware.
    pub store: Arc<CounterStore>,
    /// Host resource sampler, shared with the exporter.
    pub sampler: Arc<dyn HostSampler>,
}
