use engine_core::{
    connectors::source::{PartitionLocator, PartitionOpener, PartitionReader},
    error::SourceError,
    metrics::PipelineMetrics,
};
use model::{
    execution::failed_record::{FailedRecord, FailureStage},
    records::record::Record,
};
use tracing::{debug, warn};

/// Lazy record stream over an ordered sequence of partitions.
///
/// Partitions are opened one at a time, only when the previous one is exhausted. A
/// partition that fails to open, or a read that fails, abandons the rest of that
/// partition; the stream itself never ends early because of it.
pub struct PartitionedSource<L> {
    locators: L,
    opener: Box<dyn PartitionOpener>,
    current: Option<Box<dyn PartitionReader>>,
    metrics: PipelineMetrics,
    records_read: u64,
    errors: u64,
    partitions_opened: u64,
    failures: Vec<FailedRecord>,
}

impl<L> PartitionedSource<L>
where
    L: Iterator<Item = PartitionLocator>,
{
    pub fn new(locators: L, opener: Box<dyn PartitionOpener>, metrics: PipelineMetrics) -> Self {
        PartitionedSource {
            locators,
            opener,
            current: None,
            metrics,
            records_read: 0,
            errors: 0,
            partitions_opened: 0,
            failures: Vec::new(),
        }
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn partitions_opened(&self) -> u64 {
        self.partitions_opened
    }

    /// Source failures recorded since the last call.
    pub fn take_failures(&mut self) -> Vec<FailedRecord> {
        std::mem::take(&mut self.failures)
    }

    fn record_error(&mut self, err: &SourceError) {
        warn!(partition = %err.path(), error = %err, "Skipping rest of partition");
        self.errors += 1;
        self.metrics.increment_source_errors(1);

        let error_type = match err {
            SourceError::Open { .. } => "OpenError",
            SourceError::Read { .. } => "ReadError",
            SourceError::Query { .. } => "QueryError",
        };
        self.failures.push(
            FailedRecord::new(
                FailureStage::Source,
                err.path(),
                error_type,
                err.to_string(),
            )
            .with_partition(err.path()),
        );
    }

    fn open_next(&mut self) -> bool {
        while let Some(locator) = self.locators.next() {
            match self.opener.open(&locator) {
                Ok(reader) => {
                    debug!(partition = %locator.path.display(), "Opened partition");
                    self.partitions_opened += 1;
                    self.current = Some(reader);
                    return true;
                }
                Err(err) => self.record_error(&err),
            }
        }
        false
    }
}

impl<L> Iterator for PartitionedSource<L>
where
    L: Iterator<Item = PartitionLocator>,
{
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let Some(reader) = self.current.as_mut() else {
                if self.open_next() {
                    continue;
                }
                return None;
            };

            match reader.next_record() {
                Ok(Some(record)) => {
                    self.records_read += 1;
                    self.metrics.increment_seen(1);
                    return Some(record);
                }
                Ok(None) => {
                    debug!(partition = %reader.path().display(), "Partition exhausted");
                    self.current = None;
                }
                Err(err) => {
                    self.current = None;
                    self.record_error(&err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::file::segment::writer::SegmentPartWriter;
    use engine_core::connectors::source::{SegmentPartOpener, WholeFileOpener};
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn write_part(path: &Path, keys: &[&str]) {
        let mut writer = SegmentPartWriter::create(path).unwrap();
        for key in keys {
            writer.append(key, key.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn reads_partitions_in_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write_part(&a, &["1", "2"]);
        write_part(&b, &["3"]);

        let metrics = PipelineMetrics::new();
        let source = PartitionedSource::new(
            vec![PartitionLocator::new(&a), PartitionLocator::new(&b)].into_iter(),
            Box::new(SegmentPartOpener),
            metrics.clone(),
        );
        let keys: Vec<String> = source.map(|r| r.key).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
        assert_eq!(metrics.records_seen(), 3);
    }

    #[test]
    fn unreadable_partitions_are_skipped_and_counted() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        let corrupt = dir.path().join("corrupt");
        write_part(&good, &["x"]);
        fs::write(&corrupt, b"not a segment part").unwrap();

        let metrics = PipelineMetrics::new();
        let mut source = PartitionedSource::new(
            vec![
                PartitionLocator::new(dir.path().join("missing")),
                PartitionLocator::new(&corrupt),
                PartitionLocator::new(&good),
            ]
            .into_iter(),
            Box::new(SegmentPartOpener),
            metrics.clone(),
        );

        let records: Vec<Record> = source.by_ref().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(source.records_read(), 1);
        assert_eq!(source.errors(), 2);
        assert_eq!(metrics.source_errors(), 2);

        let failures = source.take_failures();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| f.stage == FailureStage::Source));
        assert!(source.take_failures().is_empty());
    }

    #[test]
    fn truncated_part_keeps_records_before_the_damage() {
        let dir = tempdir().unwrap();
        let part = dir.path().join("data");
        write_part(&part, &["first", "second"]);
        let bytes = fs::read(&part).unwrap();
        fs::write(&part, &bytes[..bytes.len() - 3]).unwrap();

        let mut source = PartitionedSource::new(
            std::iter::once(PartitionLocator::new(&part)),
            Box::new(SegmentPartOpener),
            PipelineMetrics::new(),
        );
        assert_eq!(source.next().map(|r| r.key).as_deref(), Some("first"));
        assert!(source.next().is_none());
        assert_eq!(source.errors(), 1);
    }

    #[test]
    fn whole_files_become_records() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        fs::write(dir.path().join("b.txt"), b"beta").unwrap();

        let source = PartitionedSource::new(
            connectors::file::tree::walk(dir.path()),
            Box::new(WholeFileOpener),
            PipelineMetrics::new(),
        );
        let payloads: Vec<Vec<u8>> = source.map(|r| r.payload).collect();
        assert_eq!(payloads, vec![b"alpha".to_vec(), b"beta".to_vec()]);
    }

    #[test]
    fn empty_locator_list_ends_immediately() {
        let mut source = PartitionedSource::new(
            std::iter::empty(),
            Box::new(WholeFileOpener),
            PipelineMetrics::new(),
        );
        assert!(source.next().is_none());
        assert_eq!(source.partitions_opened(), 0);
    }
}
