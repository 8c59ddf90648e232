//! Metric samples and their line-protocol rendering.

use std::fmt;

use super::host::HostSample;
use super::store::CounterSnapshot;

/// Numeric field value of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One exported field: `family,tag=value,... field=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub family: &'static str,
    pub tags: Vec<(&'static str, String)>,
    pub field: &'static str,
    pub value: FieldValue,
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family)?;
        for (key, value) in &self.tags {
            write!(f, ",{}={}", key, escape_tag(value))?;
        }
        write!(f, " {}={}", self.field, self.value)
    }
}

/// Escapes the characters line protocol treats as separators in tag values.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds every exported sample for one tick.
///
/// The `system` family is skipped when `host` is `None`.
pub fn render_samples(
    snapshot: &CounterSnapshot,
    host: Option<&HostSample>,
    source: &str,
) -> Vec<MetricSample> {
    let tagged = |family, field, value| MetricSample {
        family,
        tags: vec![("source", source.to_string())],
        field,
        value,
    };
    let by_method = |method: &str, field, value| MetricSample {
        family: "request",
        tags: vec![
            ("source", source.to_string()),
            ("method", method.to_string()),
        ],
        field,
        value: FieldValue::Unsigned(value),
    };

    let mut samples = vec![
        by_method("all", "total", snapshot.total_requests),
        by_method("get", "get", snapshot.get_requests),
        by_method("post", "post", snapshot.post_requests),
        by_method("put", "put", snapshot.put_requests),
        by_method("delete", "delete", snapshot.delete_requests),
        tagged("chaos", "chaos", FieldValue::Unsigned(snapshot.chaos)),
    ];

    if let Some(host) = host {
        samples.push(tagged("system", "cpu", FieldValue::Float(host.cpu_percent)));
        samples.push(tagged(
            "system",
            "memory",
            FieldValue::Float(host.memory_percent),
        ));
    }

    samples.extend([
        tagged("user", "users", FieldValue::Signed(snapshot.active_sessions)),
        tagged("purchase", "sold", FieldValue::Unsigned(snapshot.sold_items)),
        tagged("purchase", "revenue", FieldValue::Float(snapshot.revenue)),
        tagged(
            "purchase",
            "creationFailure",
            FieldValue::Unsigned(snapshot.failed_items),
        ),
        tagged("auth", "good", FieldValue::Unsigned(snapshot.successful_auth)),
        tagged("auth", "bad", FieldValue::Unsigned(snapshot.failed_auth)),
        tagged(
            "latency",
            "latency",
            FieldValue::Float(snapshot.mean_request_latency_ms()),
        ),
        tagged(
            "latency",
            "orderLatency",
            FieldValue::Float(snapshot.mean_order_latency_ms()),
        ),
    ]);

    samples
}

/// Joins samples into the newline-separated request body.
pub fn render_lines(samples: &[MetricSample]) -> String {
    samples
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
