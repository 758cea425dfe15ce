use engine_core::metrics::MetricsSnapshot;
use std::time::{Duration, Instant};
use tracing::info;

/// Emits a progress line at most once per interval.
pub struct ProgressReporter {
    interval: Duration,
    started: Instant,
    last: Instant,
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        ProgressReporter {
            interval,
            started: now,
            last: now,
        }
    }

    /// Logs when the interval has passed since the previous line. Returns whether it did.
    pub fn tick(&mut self, snapshot: &MetricsSnapshot, last_key: Option<&str>) -> bool {
        if self.last.elapsed() < self.interval {
            return false;
        }
        self.last = Instant::now();
        self.log(snapshot, last_key);
        true
    }

    pub fn log(&self, snapshot: &MetricsSnapshot, last_key: Option<&str>) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            snapshot.records_seen as f64 / elapsed
        } else {
            0.0
        };
        info!(
            records = snapshot.records_seen,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            timed_out = snapshot.timed_out,
            elapsed = %format!("{elapsed:.1}s"),
            rate = %format!("{rate:.1}/s"),
            last_key = last_key.unwrap_or("-"),
            "Progress"
        );
    }
}
