#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Json;
use axum::http::{Method, Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use metrotron::config::MetricsConfig;
use metrotron::metrics::CounterStore;
use metrotron::middleware::{observed, RequestObserver};
use serde_json::Value;

pub fn metrics_config(url: &str) -> MetricsConfig {
    MetricsConfig {
        url: url.to_string(),
        source: "pizza-service-test".to_string(),
        user_id: "1234".to_string(),
        api_key: "glc_test".to_string(),
        period_in_ms: 50,
        timeout_in_ms: 1_000,
        auth_path: "/api/auth".to_string(),
        order_path: "/api/order".to_string(),
        chaos_prefix: "/api/order/chaos/".to_string(),
        body_limit_bytes: 4096,
    }
}

/// Stand-in for the pizza service: auth succeeds when the body carries
/// `"password": "ok"`, orders succeed unless the body sets `"fail": true`.
/// The order handler echoes the item count so tests can check the body
/// reached it intact.
pub fn host_app() -> Router {
    Router::new()
        .route(
            "/api/auth",
            post(login).put(login).delete(|| async { StatusCode::OK }),
        )
        .route("/api/order", post(create_order))
        .route("/api/order/menu", get(|| async { "[]" }))
        .route(
            "/api/order/chaos/:state",
            axum::routing::put(|| async { StatusCode::FORBIDDEN }),
        )
        .route("/api/franchise", get(|| async { "[]" }))
}

async fn login(Json(body): Json<Value>) -> StatusCode {
    if body["password"] == "ok" {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn create_order(Json(body): Json<Value>) -> (StatusCode, String) {
    let items = body["items"].as_array().map(Vec::len).unwrap_or(0);
    if body["fail"] == true {
        (StatusCode::INTERNAL_SERVER_ERROR, items.to_string())
    } else {
        (StatusCode::OK, items.to_string())
    }
}

pub fn observed_app() -> (Router, Arc<CounterStore>) {
    let store = Arc::new(CounterStore::new());
    let observer = Arc::new(RequestObserver::new(
        store.clone(),
        &metrics_config("http://127.0.0.1:9/unused"),
    ));
    (observed(host_app(), observer), store)
}

pub fn json_request(method: Method, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn empty_request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}
