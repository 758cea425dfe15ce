use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Tunables of the ingestion pipeline.
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Number of parser workers (`n`)
    pub workers: usize,
    /// Records submitted together (`g`); defaults to `workers`
    pub group_size: Option<usize>,
    /// Buffered documents that trigger a flush (`B`)
    pub commit_threshold: usize,
    /// Per-task parse timeout (`T`)
    pub task_timeout_ms: u64,
    /// Sleep after a failed bulk write, before degraded per-item writes
    pub sink_backoff_ms: u64,
    /// Timeout of a single request to a remote sink
    pub sink_request_timeout_ms: u64,
    pub progress_interval_ms: u64,
    /// Records with larger payloads are skipped without parsing
    pub max_payload_bytes: usize,
    pub commit_attempts: usize,
    pub commit_retry_base_ms: u64,
    /// JSON-lines file receiving records and documents that did not reach the sink
    pub failed_log: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            workers: 5,
            group_size: None,
            commit_threshold: 1000,
            task_timeout_ms: 15_000,
            sink_backoff_ms: 10_000,
            sink_request_timeout_ms: 60_000,
            progress_interval_ms: 2_000,
            max_payload_bytes: 64 * 1024 * 1024,
            commit_attempts: 3,
            commit_retry_base_ms: 500,
            failed_log: None,
        }
    }
}

impl PipelineSettings {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = Some(group_size);
        self
    }

    pub fn with_commit_threshold(mut self, threshold: usize) -> Self {
        self.commit_threshold = threshold;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_sink_backoff(mut self, backoff: Duration) -> Self {
        self.sink_backoff_ms = duration_ms(backoff);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    pub fn with_commit_attempts(mut self, attempts: usize) -> Self {
        self.commit_attempts = attempts;
        self
    }

    pub fn with_failed_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.failed_log = Some(path.into());
        self
    }

    pub fn group_size(&self) -> usize {
        self.group_size.unwrap_or(self.workers)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn sink_backoff(&self) -> Duration {
        Duration::from_millis(self.sink_backoff_ms)
    }

    pub fn sink_request_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_request_timeout_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn commit_retry_base(&self) -> Duration {
        Duration::from_millis(self.commit_retry_base_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
