//! Request observer: turns each completed request into counter updates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::Router;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::MetricsConfig;
use crate::metrics::CounterStore;

/// A line item of an order request body.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// `None` when the item has no numeric `price`.
    pub price: Option<f64>,
}

/// Everything the classifier needs to know about a finished request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub duration: Duration,
    /// Order line items, only parsed for order creation requests.
    pub items: Option<Vec<OrderItem>>,
}

impl RequestContext {
    fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}

/// Extracts `items[].price` from an order body.
///
/// Returns `None` for bodies that are not JSON or have no `items` array.
pub fn order_items(body: &[u8]) -> Option<Vec<OrderItem>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let items = value.get("items")?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| OrderItem {
                price: item.get("price").and_then(Value::as_f64),
            })
            .collect(),
    )
}

/// Maps request outcomes onto counter updates.
#[derive(Debug, Clone)]
pub struct Classifier {
    auth_path: String,
    order_path: String,
    chaos_prefix: String,
}

impl Classifier {
    pub fn new(
        auth_path: impl Into<String>,
        order_path: impl Into<String>,
        chaos_prefix: impl Into<String>,
    ) -> Self {
        Self {
            auth_path: auth_path.into(),
            order_path: order_path.into(),
            chaos_prefix: chaos_prefix.into(),
        }
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(
            config.auth_path.as_str(),
            config.order_path.as_str(),
            config.chaos_prefix.as_str(),
        )
    }

    /// Whether the request body should be buffered for item inspection.
    pub fn is_order_creation(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && path == self.order_path
    }

    /// Applies every counter update implied by `ctx`.
    pub fn classify(&self, ctx: &RequestContext, store: &CounterStore) {
        store.record_request(&ctx.method, ctx.duration);

        if ctx.path == self.auth_path {
            match ctx.method {
                Method::POST | Method::PUT => store.record_login(ctx.succeeded()),
                // Logout always ends the session, whatever the handler answered.
                Method::DELETE => store.record_logout(),
                _ => {}
            }
        }

        if self.is_order_creation(&ctx.method, &ctx.path) {
            self.classify_order(ctx, store);
        }

        if ctx.method == Method::PUT && ctx.path.starts_with(&self.chaos_prefix) {
            store.record_chaos();
        }
    }

    fn classify_order(&self, ctx: &RequestContext, store: &CounterStore) {
        let success = ctx.succeeded();
        match &ctx.items {
            Some(items) => {
                for item in items {
                    if success {
                        store.record_item_sold(item.price.unwrap_or(0.0));
                    } else {
                        store.record_item_failed();
                    }
                }
            }
            None => debug!(
                path = ctx.path.as_str(),
                status = ctx.status.as_u16(),
                "order request without readable items, skipping item counters"
            ),
        }
        if success {
            store.record_order_latency(ctx.duration);
        }
    }
}

/// Shared state of the observer middleware.
pub struct RequestObserver {
    store: Arc<CounterStore>,
    classifier: Classifier,
    body_limit: usize,
}

impl RequestObserver {
    pub fn new(store: Arc<CounterStore>, config: &MetricsConfig) -> Self {
        Self {
            store,
            classifier: Classifier::from_config(config),
            body_limit: config.body_limit_bytes,
        }
    }

    /// Buffers the body so its items can be counted, then hands the same
    /// bytes on to the handler.
    ///
    /// Bodies known to exceed the limit are passed through unread. A body of
    /// unknown length is read chunk by chunk; once it passes the limit the
    /// bytes read so far are forwarded ahead of the unread remainder and no
    /// items are reported.
    async fn buffer_order(&self, request: Request) -> (Request, Option<Vec<OrderItem>>) {
        let declared_len = request.body().size_hint().lower();
        if declared_len > self.body_limit as u64 {
            debug!(
                content_length = declared_len,
                limit = self.body_limit,
                "order body above inspection limit, not buffering"
            );
            return (request, None);
        }

        let (parts, body) = request.into_parts();
        let mut chunks = body.into_data_stream();
        let mut buffered = Vec::new();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    buffered.extend_from_slice(&chunk);
                    if buffered.len() > self.body_limit {
                        debug!(
                            read = buffered.len(),
                            limit = self.body_limit,
                            "streamed order body above inspection limit, forwarding unread"
                        );
                        let head = stream::once(ready(Ok::<_, axum::Error>(Bytes::from(buffered))));
                        let body = Body::from_stream(head.chain(chunks));
                        return (Request::from_parts(parts, body), None);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read order body");
                    return (Request::from_parts(parts, Body::empty()), None);
                }
            }
        }

        let bytes = Bytes::from(buffered);
        let items = order_items(&bytes);
        (Request::from_parts(parts, Body::from(bytes)), items)
    }
}

/// Axum middleware counting every request that passes through it.
///
/// Classification runs once the inner service has produced its response,
/// so the final status code is known. The response is returned unchanged.
pub async fn observe_requests(
    State(observer): State<Arc<RequestObserver>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let (request, items) = if observer.classifier.is_order_creation(&method, &path) {
        observer.buffer_order(request).await
    } else {
        (request, None)
    };

    let response = next.run(request).await;

    let ctx = RequestContext {
        method,
        path,
        status: response.status(),
        duration: start.elapsed(),
        items,
    };
    observer.classifier.classify(&ctx, &observer.store);

    response
}

/// Wraps every route of `router`, including its fallback, with the observer.
pub fn observed<S>(router: Router<S>, observer: Arc<RequestObserver>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(observer, observe_requests))
}
