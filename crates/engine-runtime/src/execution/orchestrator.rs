use crate::execution::{factory::SourcePlan, progress::ProgressReporter};
use chrono::Utc;
use engine_config::{report::summary::RunSummary, settings::pipeline::PipelineSettings};
use engine_core::{
    connectors::sink::Sink,
    metrics::PipelineMetrics,
    parser::Parser,
    progress::ProgressStage,
    retry::RetryPolicy,
};
use engine_processing::{
    batcher::Batcher,
    commit::{CommitBuffer, SinkWriter},
    error::ProcessingError,
    failed_record_writer::FailedRecordWriter,
    source::PartitionedSource,
    worker::{pool::WorkerPool, supervisor::TaskSupervisor},
};
use model::execution::failed_record::FailedRecord;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

const COMMIT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Drives one run: `Idle -> Running -> Draining -> Done`.
///
/// A single task owns the record cursor, the commit buffer and every sink call; only
/// parsing runs in parallel. An interrupt is honoured between batches, after the
/// current batch's waits have resolved, and always goes through Draining.
pub struct Orchestrator {
    settings: PipelineSettings,
    sink: Arc<dyn Sink>,
    parser: Arc<dyn Parser>,
    metrics: PipelineMetrics,
    failed_log: Option<FailedRecordWriter>,
    run_id: Uuid,
    stage: ProgressStage,
}

impl Orchestrator {
    pub fn new(settings: PipelineSettings, sink: Arc<dyn Sink>, parser: Arc<dyn Parser>) -> Self {
        let run_id = Uuid::new_v4();
        let failed_log = settings
            .failed_log
            .as_ref()
            .map(|path| FailedRecordWriter::new(path, run_id.to_string()));

        Orchestrator {
            settings,
            sink,
            parser,
            metrics: PipelineMetrics::new(),
            failed_log,
            run_id,
            stage: ProgressStage::Idle,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> ProgressStage {
        self.stage
    }

    /// Counters of this run. Clones stay live while the run progresses.
    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.clone()
    }

    pub async fn run(
        mut self,
        source: SourcePlan,
        cancel: CancellationToken,
    ) -> Result<RunSummary, ProcessingError> {
        let started_at = Utc::now();
        let settings = self.settings.clone();

        let records = PartitionedSource::new(source.locators, source.opener, self.metrics.clone());
        let mut batches = Batcher::new(records, settings.group_size())?;
        let supervisor = TaskSupervisor::new(
            WorkerPool::new(settings.workers),
            self.parser.clone(),
            settings.task_timeout(),
            self.metrics.clone(),
        )
        .with_max_payload_bytes(settings.max_payload_bytes);
        let mut buffer = CommitBuffer::new(settings.commit_threshold);
        let mut writer = SinkWriter::new(
            self.sink.clone(),
            settings.sink_backoff(),
            self.metrics.clone(),
        )
        .with_commit_retry(RetryPolicy::new(
            settings.commit_attempts,
            settings.commit_retry_base(),
            COMMIT_MAX_DELAY,
        ));
        let mut progress = ProgressReporter::new(settings.progress_interval());

        self.advance(ProgressStage::Running);
        info!(
            run_id = %self.run_id,
            sink = writer.sink_name(),
            parser = self.parser.name(),
            workers = settings.workers,
            group_size = batches.size(),
            commit_threshold = buffer.threshold(),
            "Pipeline started"
        );

        let mut interrupted = false;
        let mut last_key = None;
        loop {
            if cancel.is_cancelled() {
                warn!("Interrupt received, draining before exit");
                interrupted = true;
                break;
            }
            let Some(batch) = batches.next() else {
                break;
            };

            let report = supervisor.run_batch(batch).await;
            self.log_failures(batches.get_mut().take_failures()).await;
            self.log_failures(report.failures).await;
            if report.last_key.is_some() {
                last_key = report.last_key;
            }

            buffer.push_all(report.documents);
            if let Some(outcome) = writer.flush_if_full(&mut buffer).await {
                self.log_failures(outcome.failures).await;
            }

            progress.tick(&self.metrics.snapshot(), last_key.as_deref());
        }
        self.log_failures(batches.get_mut().take_failures()).await;

        self.advance(ProgressStage::Draining);
        let drained = writer.drain(&mut buffer).await;
        if let Some(outcome) = drained.flush {
            self.log_failures(outcome.failures).await;
        }
        supervisor.shutdown();

        self.advance(ProgressStage::Done);
        let snapshot = self.metrics.snapshot();
        progress.log(&snapshot, last_key.as_deref());

        let summary = RunSummary::new(self.run_id, started_at, self.stage, snapshot)
            .with_interrupted(interrupted)
            .with_commit_ok(drained.committed);
        info!(
            run_id = %summary.run_id,
            records = snapshot.records_seen,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            timed_out = snapshot.timed_out,
            skipped = snapshot.skipped,
            source_errors = snapshot.source_errors,
            written = snapshot.documents_written,
            rejected = snapshot.documents_rejected,
            lost = snapshot.documents_lost,
            flushes = snapshot.flushes,
            committed = drained.committed,
            interrupted,
            elapsed_ms = summary.elapsed_ms,
            "Pipeline finished"
        );
        if !snapshot.is_balanced() {
            warn!(
                records = snapshot.records_seen,
                accounted = snapshot.accounted(),
                "Record counters do not add up"
            );
        }

        Ok(summary)
    }

    fn advance(&mut self, to: ProgressStage) {
        debug_assert_eq!(self.stage.next(), Some(to));
        info!(from = %self.stage, to = %to, "Pipeline stage changed");
        self.stage = to;
    }

    async fn log_failures(&self, failures: Vec<FailedRecord>) {
        let Some(log) = &self.failed_log else {
            return;
        };
        if let Err(err) = log.write_batch(failures).await {
            warn!(path = %log.path().display(), error = %err, "Failed to write failed records");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::{
        connectors::{
            sink::BulkResponse,
            source::{PartitionLocator, PartitionOpener, PartitionReader},
        },
        error::{ParseError, SinkError, SourceError},
    };
    use model::records::{document::Document, record::Record};
    use std::{
        path::{Path, PathBuf},
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Yields `count` records per locator, keyed `<locator>/<i>`.
    struct Synthetic {
        count: usize,
    }

    struct SyntheticPartition {
        path: PathBuf,
        next: usize,
        count: usize,
    }

    impl PartitionOpener for Synthetic {
        fn open(
            &self,
            locator: &PartitionLocator,
        ) -> Result<Box<dyn PartitionReader>, SourceError> {
            Ok(Box::new(SyntheticPartition {
                path: locator.path.clone(),
                next: 0,
                count: self.count,
            }))
        }
    }

    impl PartitionReader for SyntheticPartition {
        fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
            if self.next == self.count {
                return Ok(None);
            }
            self.next += 1;
            let key = format!("{}/{}", self.path.display(), self.next);
            Ok(Some(Record::new(key, "payload")))
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    struct Echo;

    impl Parser for Echo {
        fn parse(&self, record: &Record, _: &CancellationToken) -> Result<Document, ParseError> {
            Ok(Document::new(record.key.clone()))
        }
    }

    #[derive(Default)]
    struct Counting {
        bulk: AtomicUsize,
        docs: AtomicUsize,
        commits: AtomicUsize,
    }

    #[async_trait]
    impl Sink for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError> {
            self.bulk.fetch_add(1, Ordering::SeqCst);
            self.docs.fetch_add(docs.len(), Ordering::SeqCst);
            Ok(BulkResponse::all_accepted(docs.len()))
        }

        async fn write_one(&self, _: &Document) -> Result<(), SinkError> {
            self.docs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn commit(&self) -> Result<(), SinkError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn plan(partitions: usize, per_partition: usize) -> SourcePlan {
        SourcePlan {
            locators: Box::new(
                (0..partitions).map(|p| PartitionLocator::new(format!("part-{p}"))),
            ),
            opener: Box::new(Synthetic {
                count: per_partition,
            }),
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings::default()
            .with_workers(3)
            .with_commit_threshold(10)
            .with_task_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn runs_to_done_and_commits_once() {
        let sink = Arc::new(Counting::default());
        let orchestrator = Orchestrator::new(settings(), sink.clone(), Arc::new(Echo));
        assert_eq!(orchestrator.stage(), ProgressStage::Idle);

        let summary = orchestrator
            .run(plan(3, 9), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.stage, ProgressStage::Done);
        assert!(summary.commit_ok);
        assert!(!summary.interrupted);
        assert_eq!(summary.counters.records_seen, 27);
        assert_eq!(summary.counters.documents_written, 27);
        assert!(summary.counters.is_balanced());
        assert_eq!(sink.docs.load(Ordering::SeqCst), 27);
        assert_eq!(sink.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn interrupt_before_start_still_drains() {
        let sink = Arc::new(Counting::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = Orchestrator::new(settings(), sink.clone(), Arc::new(Echo))
            .run(plan(2, 5), cancel)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.stage, ProgressStage::Done);
        assert_eq!(summary.counters.records_seen, 0);
        assert_eq!(sink.bulk.load(Ordering::SeqCst), 0);
        assert_eq!(sink.commits.load(Ordering::SeqCst), 1);
    }
}
