use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where and how often metrics are pushed, and which paths carry business meaning.
#[derive(Deserialize, Serialize, Clone, JsonSchema)]
pub struct MetricsConfig {
    /// Push endpoint of the metrics backend.
    pub url: String,
    /// Value of the `source` tag on every record.
    pub source: String,
    pub user_id: String,
    pub api_key: String,
    #[serde(default = "default_period_in_ms")]
    pub period_in_ms: u64,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Login (POST/PUT) and logout (DELETE) endpoint.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    /// Order creation (POST) endpoint.
    #[serde(default = "default_order_path")]
    pub order_path: String,
    #[serde(default = "default_chaos_prefix")]
    pub chaos_prefix: String,
    /// Largest order body buffered for item inspection.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_period_in_ms() -> u64 {
    10_000
}

fn default_timeout_in_ms() -> u64 {
    5_000
}

fn default_auth_path() -> String {
    "/api/auth".to_string()
}

fn default_order_path() -> String {
    "/api/order".to_string()
}

fn default_chaos_prefix() -> String {
    "/chaos/".to_string()
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

impl MetricsConfig {
    /// Export period. `tokio::time::interval` panics on zero, so this is at least 1ms.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_in_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    /// `Authorization` header value for the push request.
    pub fn authorization(&self) -> String {
        format!("Bearer {}:{}", self.user_id, self.api_key)
    }
}

impl fmt::Debug for MetricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("url", &self.url)
            .field("source", &self.source)
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .field("period_in_ms", &self.period_in_ms)
            .field("timeout_in_ms", &self.timeout_in_ms)
            .field("auth_path", &self.auth_path)
            .field("order_path", &self.order_path)
            .field("chaos_prefix", &self.chaos_prefix)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}
