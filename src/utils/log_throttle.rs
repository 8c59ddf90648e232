use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct WindowState {
    window_started_at: Instant,
    suppressed: u64,
}

/// Rate limiter for repeated log lines, keyed by event name.
///
/// The exporter pushes every few seconds, so an unreachable backend would
/// otherwise produce one warning per tick.
#[derive(Debug, Default)]
pub struct LogThrottle {
    windows: Mutex<HashMap<String, WindowState>>,
}

impl LogThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(suppressed_count)` when a log for `key` should be emitted,
    /// otherwise `None` and the event is counted as suppressed for the active window.
    pub fn should_emit(&self, key: &str, interval: Duration) -> Option<u64> {
        let mut windows = self.windows.lock();
        let now = Instant::now();

        match windows.get_mut(key) {
            Some(state) if now.duration_since(state.window_started_at) >= interval => {
                let suppressed = state.suppressed;
                state.window_started_at = now;
                state.suppressed = 0;
                Some(suppressed)
            }
            Some(state) => {
                state.suppressed += 1;
                None
            }
            None => {
                windows.insert(
                    key.to_string(),
                    WindowState {
                        window_started_at: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogThrottle;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn emits_then_suppresses_then_emits_with_count() {
        let throttle = LogThrottle::new();
        let key = "metrics.export.failed";
        let interval = Duration::from_millis(20);

        assert_eq!(throttle.should_emit(key, interval), Some(0));
        assert_eq!(throttle.should_emit(key, interval), None);
        assert_eq!(throttle.should_emit(key, interval), None);

        sleep(Duration::from_millis(30));
        assert_eq!(throttle.should_emit(key, interval), Some(2));
    }

    #[test]
    fn keys_are_throttled_independently() {
        let throttle = LogThrottle::new();
        let interval = Duration::from_secs(60);

        assert_eq!(throttle.should_emit("a", interval), Some(0));
        assert_eq!(throttle.should_emit("b", interval), Some(0));
        assert_eq!(throttle.should_emit("a", interval), None);
    }
}
