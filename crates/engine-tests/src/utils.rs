#![allow(dead_code)]

use async_trait::async_trait;
use connectors::file::segment::writer::SegmentPartWriter;
use engine_core::{
    connectors::{
        sink::{BulkResponse, Sink},
        source::{PartitionLocator, PartitionOpener, PartitionReader},
    },
    error::{ParseError, SinkError, SourceError},
    parser::Parser,
};
use engine_runtime::execution::factory::SourcePlan;
use model::records::{document::Document, record::Record};
use std::{
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Source of `count` records in one partition, keyed `<partition>/<n>` with `n` starting at 1.
pub fn synthetic_source(partition: &str, count: usize) -> SourcePlan {
    SourcePlan {
        locators: Box::new(std::iter::once(PartitionLocator::new(partition))),
        opener: Box::new(SyntheticOpener { count }),
    }
}

struct SyntheticOpener {
    count: usize,
}

struct SyntheticReader {
    path: PathBuf,
    next: usize,
    count: usize,
}

impl PartitionOpener for SyntheticOpener {
    fn open(&self, locator: &PartitionLocator) -> Result<Box<dyn PartitionReader>, SourceError> {
        Ok(Box::new(SyntheticReader {
            path: locator.path.clone(),
            next: 0,
            count: self.count,
        }))
    }
}

impl PartitionReader for SyntheticReader {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        if self.next == self.count {
            return Ok(None);
        }
        self.next += 1;
        let key = format!("{}/{}", self.path.display(), self.next);
        Ok(Some(Record::new(key, format!("payload {}", self.next))))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// What the scripted parser does with the record at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    /// Blocks until the task is cancelled.
    Hang,
    /// Sleeps for the given time and then succeeds, never looking at the cancel token.
    Stall(Duration),
}

type Script = Box<dyn Fn(usize) -> Behaviour + Send + Sync>;

/// Parser whose outcome is chosen by the record's position (the number after the last `/`).
pub struct ScriptedParser {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedParser {
    pub fn new(script: impl Fn(usize) -> Behaviour + Send + Sync + 'static) -> Self {
        ScriptedParser {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_succeeds() -> Self {
        ScriptedParser::new(|_| Behaviour::Succeed)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn position(key: &str) -> usize {
    key.rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

impl Parser for ScriptedParser {
    fn name(&self) -> &str {
        "scripted"
    }

    fn parse(&self, record: &Record, cancel: &CancellationToken) -> Result<Document, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (self.script)(position(&record.key)) {
            Behaviour::Succeed => {
                Ok(Document::new(record.key.clone()).with_field("size", record.len() as i64))
            }
            Behaviour::Fail => Err(ParseError::Malformed {
                key: record.key.clone(),
                reason: "scripted failure".to_string(),
            }),
            Behaviour::Hang => {
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(ParseError::Cancelled {
                    key: record.key.clone(),
                })
            }
            Behaviour::Stall(duration) => {
                thread::sleep(duration);
                Ok(Document::new(record.key.clone()))
            }
        }
    }
}

/// Sink that records every call. The first `failing_bulks` bulk writes fail with a 503.
#[derive(Default)]
pub struct RecordingSink {
    bulk_sizes: Mutex<Vec<usize>>,
    single_writes: AtomicUsize,
    commits: AtomicUsize,
    failing_bulks: AtomicUsize,
}

impl RecordingSink {
    pub fn flaky(failing_bulks: usize) -> Self {
        RecordingSink {
            failing_bulks: AtomicUsize::new(failing_bulks),
            ..Default::default()
        }
    }

    /// Sizes of the bulk writes that succeeded, in call order.
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes.lock().unwrap().clone()
    }

    pub fn single_writes(&self) -> usize {
        self.single_writes.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> usize {
        self.bulk_sizes().iter().sum::<usize>() + self.single_writes()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError> {
        let failing = self
            .failing_bulks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        self.bulk_sizes.lock().unwrap().push(docs.len());
        Ok(BulkResponse::all_accepted(docs.len()))
    }

    async fn write_one(&self, _doc: &Document) -> Result<(), SinkError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<(), SinkError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Writes a segment directory `<root>/<name>/data` holding `entries`.
pub fn write_segment(root: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let segment = root.join(name);
    std::fs::create_dir_all(&segment).unwrap();
    let mut writer = SegmentPartWriter::create(segment.join("data")).unwrap();
    for (key, payload) in entries {
        writer.append(key, payload.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    segment
}

pub fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}
