use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_seen: AtomicU64,
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    skipped: AtomicU64,
    source_errors: AtomicU64,
    flushes: AtomicU64,
    bulk_writes: AtomicU64,
    degraded_flushes: AtomicU64,
    documents_written: AtomicU64,
    documents_rejected: AtomicU64,
    documents_lost: AtomicU64,
    commits: AtomicU64,
    commit_failures: AtomicU64,
}

/// Run-wide counters. Clones share the same totals.
///
/// Only the orchestrating task increments them; anyone may take a snapshot.
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_seen: u64,
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub skipped: u64,
    pub source_errors: u64,
    pub flushes: u64,
    pub bulk_writes: u64,
    pub degraded_flushes: u64,
    pub documents_written: u64,
    pub documents_rejected: u64,
    pub documents_lost: u64,
    pub commits: u64,
    pub commit_failures: u64,
}

impl MetricsSnapshot {
    /// Records whose fate is known: every record seen must end up in exactly one bucket.
    pub fn accounted(&self) -> u64 {
        self.succeeded + self.failed + self.timed_out + self.skipped
    }

    pub fn is_balanced(&self) -> bool {
        self.accounted() == self.records_seen
    }
}

macro_rules! counter {
    ($($method:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $method(&self, count: u64) {
                self.inner.$field.fetch_add(count, Ordering::Relaxed);
            }
        )*
    };
}

impl PipelineMetrics {
    pub fn new() -> Self {
        PipelineMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    counter! {
        increment_seen => records_seen,
        increment_submitted => submitted,
        increment_succeeded => succeeded,
        increment_failed => failed,
        increment_timed_out => timed_out,
        increment_skipped => skipped,
        increment_source_errors => source_errors,
        increment_flushes => flushes,
        increment_bulk_writes => bulk_writes,
        increment_degraded_flushes => degraded_flushes,
        increment_written => documents_written,
        increment_rejected => documents_rejected,
        increment_lost => documents_lost,
        increment_commits => commits,
        increment_commit_failures => commit_failures,
    }

    pub fn records_seen(&self) -> u64 {
        self.inner.records_seen.load(Ordering::Relaxed)
    }

    pub fn source_errors(&self) -> u64 {
        self.inner.source_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let inner = &self.inner;
        MetricsSnapshot {
            records_seen: load(&inner.records_seen),
            submitted: load(&inner.submitted),
            succeeded: load(&inner.succeeded),
            failed: load(&inner.failed),
            timed_out: load(&inner.timed_out),
            skipped: load(&inner.skipped),
            source_errors: load(&inner.source_errors),
            flushes: load(&inner.flushes),
            bulk_writes: load(&inner.bulk_writes),
            degraded_flushes: load(&inner.degraded_flushes),
            documents_written: load(&inner.documents_written),
            documents_rejected: load(&inner.documents_rejected),
            documents_lost: load(&inner.documents_lost),
            commits: load(&inner.commits),
            commit_failures: load(&inner.commit_failures),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_totals() {
        let metrics = PipelineMetrics::new();
        let other = metrics.clone();
        metrics.increment_seen(3);
        other.increment_succeeded(2);
        other.increment_timed_out(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.records_seen, 3);
        assert_eq!(snap.accounted(), 3);
        assert!(snap.is_balanced());
    }

    #[test]
    fn unbalanced_when_records_are_unaccounted() {
        let metrics = PipelineMetrics::new();
        metrics.increment_seen(2);
        metrics.increment_failed(1);
        assert!(!metrics.snapshot().is_balanced());
    }
}
