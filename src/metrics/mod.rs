//! Request counters, host sampling, and periodic export to the metrics backend.
//!
//! The observer middleware writes into a shared [`CounterStore`]; the
//! [`Exporter`] drains it on a timer and pushes line-protocol batches.

pub mod exporter;
pub mod host;
pub mod sample;
pub mod store;

pub use exporter::{ExportError, Exporter, HttpSink, MetricsSink};
pub use host::{HostSample, HostSampler, SampleError, SystemSampler};
pub use sample::{render_lines, render_samples, FieldValue, MetricSample};
pub use store::{CounterSnapshot, CounterStore, LatencyWindow};
