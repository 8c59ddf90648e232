//! Periodic push of rendered counters to the metrics backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::host::{HostSample, HostSampler};
use super::sample::{render_lines, render_samples};
use super::store::CounterStore;
use crate::config::MetricsConfig;
use crate::utils::log_throttle::LogThrottle;

const EXPORT_FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);
const SAMPLE_FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to reach metrics endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metrics endpoint responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Destination of rendered metric batches.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn send(&self, body: String) -> Result<(), ExportError>;
}

/// Pushes batches to an HTTP endpoint with bearer credentials.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    authorization: String,
}

impl HttpSink {
    pub fn new(config: &MetricsConfig) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            authorization: config.authorization(),
        })
    }
}

#[async_trait]
impl MetricsSink for HttpSink {
    async fn send(&self, body: String) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "pushed metrics");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ExportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Renders the counter store on a fixed period and hands each batch to a sink.
pub struct Exporter {
    store: Arc<CounterStore>,
    sampler: Arc<dyn HostSampler>,
    sink: Arc<dyn MetricsSink>,
    source: String,
    period: Duration,
    throttle: Arc<LogThrottle>,
}

impl Exporter {
    pub fn new(
        store: Arc<CounterStore>,
        sampler: Arc<dyn HostSampler>,
        sink: Arc<dyn MetricsSink>,
        source: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            sampler,
            sink,
            source: source.into(),
            period,
            throttle: Arc::new(LogThrottle::new()),
        }
    }

    /// Drains the store's latency windows and renders one batch.
    ///
    /// A failed host sample drops the `system` records for this batch only.
    pub async fn collect(&self) -> String {
        let snapshot = self.store.drain();
        let host = self.sample_host().await;
        render_lines(&render_samples(&snapshot, host.as_ref(), &self.source))
    }

    /// Reads the host sampler on the blocking pool, `None` on failure.
    async fn sample_host(&self) -> Option<HostSample> {
        let sampler = self.sampler.clone();
        let error = match spawn_blocking(move || sampler.sample()).await {
            Ok(Ok(sample)) => return Some(sample),
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        if let Some(suppressed_count) = self
            .throttle
            .should_emit("metrics.host_sample.failed", SAMPLE_FAILURE_LOG_WINDOW)
        {
            warn!(
                event_name = "metrics.host_sample.failed",
                event_domain = "metrics",
                error = error.as_str(),
                suppressed_count,
                "host sample unavailable, omitting system metrics"
            );
        }
        None
    }

    /// Collects a batch and sends it on a detached task.
    pub async fn tick(&self) -> JoinHandle<()> {
        let body = self.collect().await;
        let sink = self.sink.clone();
        let throttle = self.throttle.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.send(body).await {
                if let Some(suppressed_count) =
                    throttle.should_emit("metrics.export.failed", EXPORT_FAILURE_LOG_WINDOW)
                {
                    warn!(
                        event_name = "metrics.export.failed",
                        event_domain = "metrics",
                        error = %e,
                        suppressed_count,
                        "failed to push metrics"
                    );
                }
            }
        })
    }

    /// Runs the export loop on the current runtime.
    ///
    /// Sends are never awaited by the loop, so a slow backend cannot delay
    /// later ticks; only the host sample is awaited. Abort the returned handle to stop exporting.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                drop(self.tick().await);
            }
        })
    }
}
