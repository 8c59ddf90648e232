//! Shared counter store mutated by the request observer and drained by the exporter.

use std::time::Duration;

use http::Method;
use parking_lot::Mutex;

/// Running latency total and sample count for one export window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyWindow {
    pub total: Duration,
    pub count: u64,
}

impl LatencyWindow {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.count += 1;
    }

    /// Mean latency in milliseconds, `0.0` for an empty window.
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() * 1000.0 / self.count as f64
    }
}

/// Point-in-time copy of every counter.
///
/// Everything except `active_sessions` and the two latency windows is
/// cumulative for the lifetime of the process. `active_sessions` is a gauge
/// built from login/logout deltas and may go negative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterSnapshot {
    pub total_requests: u64,
    pub get_requests: u64,
    pub post_requests: u64,
    pub put_requests: u64,
    pub delete_requests: u64,
    pub successful_auth: u64,
    pub failed_auth: u64,
    pub active_sessions: i64,
    pub sold_items: u64,
    pub failed_items: u64,
    pub revenue: f64,
    pub chaos: u64,
    pub request_window: LatencyWindow,
    pub order_window: LatencyWindow,
}

impl CounterSnapshot {
    pub fn mean_request_latency_ms(&self) -> f64 {
        self.request_window.mean_ms()
    }

    pub fn mean_order_latency_ms(&self) -> f64 {
        self.order_window.mean_ms()
    }
}

/// Thread-safe counter store.
///
/// The observer calls the `record_*` methods, the exporter calls `drain()`
/// once per tick. All state sits behind one lock so a reader never sees a
/// half-applied update and a latency sum is always reset with its count.
#[derive(Default)]
pub struct CounterStore {
    inner: Mutex<CounterSnapshot>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a completed request and adds its duration to the request window.
    pub fn record_request(&self, method: &Method, duration: Duration) {
        let mut counters = self.inner.lock();
        counters.total_requests += 1;
        match *method {
            Method::GET => counters.get_requests += 1,
            Method::POST => counters.post_requests += 1,
            Method::PUT => counters.put_requests += 1,
            Method::DELETE => counters.delete_requests += 1,
            _ => {}
        }
        counters.request_window.record(duration);
    }

    /// Records a login or registration attempt.
    pub fn record_login(&self, success: bool) {
        let mut counters = self.inner.lock();
        if success {
            counters.successful_auth += 1;
            counters.active_sessions += 1;
        } else {
            counters.failed_auth += 1;
        }
    }

    pub fn record_logout(&self) {
        self.inner.lock().active_sessions -= 1;
    }

    /// Counts one sold line item. Non-finite or negative prices count as
    /// sold but add nothing, so revenue never decreases.
    pub fn record_item_sold(&self, price: f64) {
        let mut counters = self.inner.lock();
        counters.sold_items += 1;
        if price.is_finite() && price > 0.0 {
            counters.revenue += price;
        }
    }

    pub fn record_item_failed(&self) {
        self.inner.lock().failed_items += 1;
    }

    pub fn record_order_latency(&self, duration: Duration) {
        self.inner.lock().order_window.record(duration);
    }

    pub fn record_chaos(&self) {
        self.inner.lock().chaos += 1;
    }

    /// Consistent copy of all counters, leaves the windows untouched.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.inner.lock().clone()
    }

    /// Clears both latency windows. Cumulative counters are kept.
    pub fn reset_interval(&self) {
        let mut counters = self.inner.lock();
        counters.request_window = LatencyWindow::default();
        counters.order_window = LatencyWindow::default();
    }

    /// Snapshot and window reset under a single lock acquisition.
    ///
    /// Requests completing after this call land in the next window.
    pub fn drain(&self) -> CounterSnapshot {
        let mut counters = self.inner.lock();
        let snapshot = counters.clone();
        counters.request_window = LatencyWindow::default();
        counters.order_window = LatencyWindow::default();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn counts_requests_per_method() {
        let store = CounterStore::new();
        for _ in 0..3 {
            store.record_request(&Method::GET, ms(1));
        }
        store.record_request(&Method::POST, ms(1));
        store.record_request(&Method::PUT, ms(1));
        store.record_request(&Method::DELETE, ms(1));
        store.record_request(&Method::PATCH, ms(1));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_requests, 7);
        assert_eq!(snapshot.get_requests, 3);
        assert_eq!(snapshot.post_requests, 1);
        assert_eq!(snapshot.put_requests, 1);
        assert_eq!(snapshot.delete_requests, 1);
        assert_eq!(snapshot.request_window.count, 7);
    }

    #[test]
    fn session_gauge_can_go_negative() {
        let store = CounterStore::new();
        store.record_logout();
        store.record_logout();
        store.record_login(true);

        assert_eq!(store.snapshot().active_sessions, -1);
    }

    #[test]
    fn failed_login_leaves_sessions_alone() {
        let store = CounterStore::new();
        store.record_login(false);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.failed_auth, 1);
        assert_eq!(snapshot.successful_auth, 0);
    }

    #[test]
    fn revenue_ignores_unusable_prices() {
        let store = CounterStore::new();
        store.record_item_sold(0.05);
        store.record_item_sold(-3.0);
        store.record_item_sold(f64::NAN);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.sold_items, 3);
        assert!((snapshot.revenue - 0.05).abs() < 1e-9);
    }

    #[test]
    fn mean_latency_is_zero_for_empty_window() {
        let snapshot = CounterStore::new().snapshot();
        assert_eq!(snapshot.mean_request_latency_ms(), 0.0);
        assert_eq!(snapshot.mean_order_latency_ms(), 0.0);
    }

    #[test]
    fn mean_latency_is_sum_over_count() {
        let store = CounterStore::new();
        store.record_request(&Method::GET, ms(10));
        store.record_request(&Method::GET, ms(30));
        store.record_order_latency(ms(7));

        let snapshot = store.snapshot();
        assert!((snapshot.mean_request_latency_ms() - 20.0).abs() < 1e-9);
        assert!((snapshot.mean_order_latency_ms() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn drain_resets_windows_but_keeps_counters() {
        let store = CounterStore::new();
        store.record_request(&Method::POST, ms(12));
        store.record_order_latency(ms(12));
        store.record_item_sold(1.5);

        let drained = store.drain();
        assert_eq!(drained.request_window.count, 1);
        assert_eq!(drained.order_window.count, 1);

        let after = store.snapshot();
        assert_eq!(after.request_window, LatencyWindow::default());
        assert_eq!(after.order_window, LatencyWindow::default());
        assert_eq!(after.total_requests, 1);
        assert_eq!(after.sold_items, 1);
        assert!((after.revenue - 1.5).abs() < 1e-9);
    }

    #[test]
    fn reset_interval_only_touches_windows() {
        let store = CounterStore::new();
        store.record_request(&Method::GET, ms(5));
        store.record_chaos();
        store.reset_interval();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.request_window.count, 0);
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.chaos, 1);
    }

    #[test]
    fn concurrent_writers_and_drains_lose_nothing() {
        let store = Arc::new(CounterStore::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.record_request(&Method::GET, ms(1));
                    }
                })
            })
            .collect();

        let mut drained = 0;
        for _ in 0..50 {
            drained += store.drain().request_window.count;
        }
        for writer in writers {
            writer.join().expect("writer thread panicked");
        }
        drained += store.drain().request_window.count;

        assert_eq!(drained, 4000);
        assert_eq!(store.snapshot().total_requests, 4000);
    }
}
