use crate::{commit::buffer::CommitBuffer, retry::classify_sink_error};
use engine_core::{
    connectors::sink::{BulkResponse, Sink},
    error::SinkError,
    metrics::PipelineMetrics,
    retry::{RetryDisposition, RetryPolicy},
};
use model::{
    execution::failed_record::{FailedRecord, FailureStage},
    records::document::Document,
};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// One bulk request for the whole buffer
    Bulk,
    /// The bulk request failed; documents were written one by one
    Degraded,
}

impl FlushMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushMode::Bulk => "bulk",
            FlushMode::Degraded => "degraded",
        }
    }
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct FlushOutcome {
    pub flush_id: u64,
    pub documents: usize,
    pub written: usize,
    pub rejected: usize,
    pub lost: usize,
    pub duration: Duration,
    pub mode: FlushMode,
    /// Rejected and lost documents, for the failed-record log
    pub failures: Vec<FailedRecord>,
}

impl FlushOutcome {
    fn new(flush_id: u64, documents: usize) -> Self {
        FlushOutcome {
            flush_id,
            documents,
            written: 0,
            rejected: 0,
            lost: 0,
            duration: Duration::ZERO,
            mode: FlushMode::Bulk,
            failures: Vec::new(),
        }
    }

    fn reject(&mut self, id: &str, reason: impl Into<String>) {
        self.rejected += 1;
        self.failures.push(FailedRecord::new(
            FailureStage::Sink,
            id,
            "Rejected",
            reason,
        ));
    }

    fn lose(&mut self, id: &str, err: &SinkError) {
        self.lost += 1;
        self.failures.push(
            FailedRecord::new(FailureStage::Sink, id, "Lost", err.to_string()).with_retryable(true),
        );
    }
}

#[derive(Debug)]
pub struct DrainOutcome {
    pub flush: Option<FlushOutcome>,
    pub committed: bool,
}

/// Writes buffered documents to the sink and commits at the end of a run.
///
/// A failed bulk write is never retried as a whole. After a transient failure the writer
/// sleeps the backoff once, then writes each document on its own; documents that still
/// fail are counted and dropped.
pub struct SinkWriter {
    sink: Arc<dyn Sink>,
    backoff: Duration,
    commit_retry: RetryPolicy,
    metrics: PipelineMetrics,
    flush_count: u64,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn Sink>, backoff: Duration, metrics: PipelineMetrics) -> Self {
        Self {
            sink,
            backoff,
            commit_retry: RetryPolicy::for_commit(),
            metrics,
            flush_count: 0,
        }
    }

    pub fn with_commit_retry(mut self, retry: RetryPolicy) -> Self {
        self.commit_retry = retry;
        self
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Flushes only when the buffer reached its threshold.
    pub async fn flush_if_full(&mut self, buffer: &mut CommitBuffer) -> Option<FlushOutcome> {
        if buffer.should_flush() {
            self.flush(buffer).await
        } else {
            None
        }
    }

    /// Writes the whole buffer and clears it, whatever the sink answered.
    /// Returns `None` without touching the sink when the buffer is empty.
    pub async fn flush(&mut self, buffer: &mut CommitBuffer) -> Option<FlushOutcome> {
        if buffer.is_empty() {
            return None;
        }

        self.flush_count += 1;
        let start = Instant::now();
        let mut outcome = FlushOutcome::new(self.flush_count, buffer.len());
        self.metrics.increment_flushes(1);
        self.metrics.increment_bulk_writes(1);

        match self.sink.write_batch(buffer.documents()).await {
            Ok(response) => self.record_bulk(response, &mut outcome),
            Err(err) => {
                let disposition = classify_sink_error(&err);
                warn!(
                    flush_id = outcome.flush_id,
                    sink = self.sink.name(),
                    error = %err,
                    transient = disposition == RetryDisposition::Retry,
                    "Bulk write failed, writing documents one by one"
                );
                if disposition == RetryDisposition::Retry && !self.backoff.is_zero() {
                    info!(backoff_ms = crate::millis(self.backoff), "Backing off");
                    tokio::time::sleep(self.backoff).await;
                }
                self.metrics.increment_degraded_flushes(1);
                outcome.mode = FlushMode::Degraded;
                self.write_each(buffer.documents(), &mut outcome).await;
            }
        }
        buffer.clear();

        outcome.duration = start.elapsed();
        self.metrics.increment_written(outcome.written as u64);
        self.metrics.increment_rejected(outcome.rejected as u64);
        self.metrics.increment_lost(outcome.lost as u64);

        let docs_per_sec = outcome.written as f64 / outcome.duration.as_secs_f64().max(1e-9);
        info!(
            flush_id = outcome.flush_id,
            documents = outcome.documents,
            written = outcome.written,
            rejected = outcome.rejected,
            lost = outcome.lost,
            duration_ms = crate::millis(outcome.duration),
            docs_per_sec = %format!("{:.2}", docs_per_sec),
            mode = outcome.mode.as_str(),
            "Flush completed"
        );
        if outcome.lost > 0 {
            error!(
                flush_id = outcome.flush_id,
                lost = outcome.lost,
                "Documents lost in degraded flush"
            );
        }

        Some(outcome)
    }

    fn record_bulk(&self, response: BulkResponse, outcome: &mut FlushOutcome) {
        outcome.written = response.accepted;
        for rejection in response.rejected {
            warn!(id = %rejection.id, reason = %rejection.reason, "Document rejected");
            outcome.reject(&rejection.id, rejection.reason);
        }
    }

    async fn write_each(&self, docs: &[Document], outcome: &mut FlushOutcome) {
        for doc in docs {
            match self.sink.write_one(doc).await {
                Ok(()) => outcome.written += 1,
                Err(err) => match classify_sink_error(&err) {
                    RetryDisposition::Stop => {
                        warn!(id = %doc.id(), error = %err, "Document rejected");
                        outcome.reject(doc.id(), err.to_string());
                    }
                    RetryDisposition::Retry => {
                        warn!(id = %doc.id(), error = %err, "Document lost");
                        outcome.lose(doc.id(), &err);
                    }
                },
            }
        }
    }

    /// Commits the sink, retrying transient failures. A final failure is logged and
    /// counted; the caller decides what it means for the run.
    pub async fn commit(&self) -> bool {
        let result = self
            .commit_retry
            .run(
                || {
                    let sink = self.sink.clone();
                    async move { sink.commit().await }
                },
                classify_sink_error,
            )
            .await;

        match result {
            Ok(()) => {
                self.metrics.increment_commits(1);
                info!(sink = self.sink.name(), "Commit succeeded");
                true
            }
            Err(err) => {
                self.metrics.increment_commit_failures(1);
                error!(sink = self.sink.name(), error = %err.into_inner(), "Commit failed");
                false
            }
        }
    }

    /// Final flush of whatever is left, then exactly one commit.
    pub async fn drain(&mut self, buffer: &mut CommitBuffer) -> DrainOutcome {
        let flush = self.flush(buffer).await;
        let committed = self.commit().await;
        DrainOutcome { flush, committed }
    }
}
