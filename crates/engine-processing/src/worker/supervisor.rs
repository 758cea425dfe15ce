use crate::worker::{
    TaskOutcome,
    pool::{TaskHandle, WorkerPool},
};
use engine_core::{metrics::PipelineMetrics, parser::Parser};
use model::{
    execution::failed_record::{FailedRecord, FailureStage},
    records::{document::Document, record::Record},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// What came out of one supervised batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<Document>,
    pub failures: Vec<FailedRecord>,
    /// Key of the last record of the batch, for progress logs
    pub last_key: Option<String>,
}

/// Runs one batch at a time on the worker pool and waits for every task of it.
pub struct TaskSupervisor {
    pool: WorkerPool,
    parser: Arc<dyn Parser>,
    task_timeout: Duration,
    max_payload_bytes: usize,
    metrics: PipelineMetrics,
}

struct Submitted {
    handle: TaskHandle,
    partition: String,
}

impl TaskSupervisor {
    pub fn new(
        pool: WorkerPool,
        parser: Arc<dyn Parser>,
        task_timeout: Duration,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            pool,
            parser,
            task_timeout,
            max_payload_bytes: usize::MAX,
            metrics,
        }
    }

    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Submits every record of `batch`, then waits for the tasks in submission order.
    ///
    /// Each wait is bounded by the task timeout, counted from the moment that wait starts.
    /// Every record ends up counted as exactly one of succeeded, failed, timed out or skipped.
    pub async fn run_batch(&self, batch: Vec<Record>) -> BatchReport {
        let mut report = BatchReport {
            last_key: batch.last().map(|r| r.key.clone()),
            ..Default::default()
        };
        let mut submitted = Vec::with_capacity(batch.len());

        for record in batch {
            if let Some(reason) = self.skip_reason(&record) {
                debug!(key = %record.key, reason, "Skipping record");
                self.metrics.increment_skipped(1);
                continue;
            }

            let partition = record.partition_display();
            let key = record.key.clone();
            match self.pool.submit(record, self.parser.clone()).await {
                Ok(handle) => {
                    self.metrics.increment_submitted(1);
                    submitted.push(Submitted { handle, partition });
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Failed to submit record");
                    self.metrics.increment_failed(1);
                    report.failures.push(
                        FailedRecord::new(FailureStage::Parse, key, "SubmitError", err.to_string())
                            .with_partition(partition),
                    );
                }
            }
        }

        for Submitted { handle, partition } in submitted {
            let key = handle.key().to_string();
            match handle.wait(self.task_timeout).await {
                TaskOutcome::Completed(doc) => {
                    self.metrics.increment_succeeded(1);
                    report.documents.push(doc);
                }
                TaskOutcome::Failed(err) => {
                    warn!(key = %key, error = %err, "Parse failed");
                    self.metrics.increment_failed(1);
                    report.failures.push(
                        FailedRecord::new(FailureStage::Parse, key, err.kind(), err.to_string())
                            .with_partition(partition),
                    );
                }
                TaskOutcome::TimedOut => {
                    warn!(
                        key = %key,
                        timeout_ms = crate::millis(self.task_timeout),
                        "Parse timed out, task cancelled"
                    );
                    self.metrics.increment_timed_out(1);
                    report.failures.push(
                        FailedRecord::new(
                            FailureStage::Timeout,
                            key,
                            "Timeout",
                            format!("no result within {:?}", self.task_timeout),
                        )
                        .with_partition(partition),
                    );
                }
            }
        }

        report
    }

    fn skip_reason(&self, record: &Record) -> Option<&'static str> {
        if record.is_empty() {
            Some("empty payload")
        } else if record.len() > self.max_payload_bytes {
            Some("payload too large")
        } else {
            None
        }
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
