//! HTTP middleware feeding the counter store.

pub mod observer;

pub use observer::{
    observe_requests, observed, order_items, Classifier, OrderItem, RequestContext,
    RequestObserver,
};
