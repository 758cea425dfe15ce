use crate::{error::ProcessingError, worker::TaskOutcome};
use engine_core::{error::ParseError, parser::Parser};
use model::records::{document::Document, record::Record};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{OnceCell, Semaphore},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fixed number of parser slots shared by every batch of a run.
///
/// Each parse runs on the blocking pool and holds one slot for as long as it actually
/// runs, even after its supervisor stopped waiting for it.
pub struct WorkerPool {
    capacity: usize,
    slots: OnceCell<Arc<Semaphore>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        WorkerPool {
            capacity: capacity.max(1),
            slots: OnceCell::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a running parse. Full capacity before first use.
    pub fn available(&self) -> usize {
        self.slots
            .get()
            .map_or(self.capacity, |slots| slots.available_permits())
    }

    pub fn is_started(&self) -> bool {
        self.slots.initialized()
    }

    pub fn is_shut_down(&self) -> bool {
        self.slots.get().is_some_and(|slots| slots.is_closed())
    }

    async fn slots(&self) -> Arc<Semaphore> {
        self.slots
            .get_or_init(|| async {
                debug!(capacity = self.capacity, "Starting worker pool");
                Arc::new(Semaphore::new(self.capacity))
            })
            .await
            .clone()
    }

    /// Starts parsing `record` and returns a handle to wait on.
    pub async fn submit(
        &self,
        record: Record,
        parser: Arc<dyn Parser>,
    ) -> Result<TaskHandle, ProcessingError> {
        let slots = self.slots().await;
        if slots.is_closed() {
            return Err(ProcessingError::PoolClosed);
        }

        let key = record.key.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let key = record.key.clone();
            let Ok(permit) = slots.acquire_owned().await else {
                return Err(ParseError::Cancelled { key });
            };
            if token.is_cancelled() {
                return Err(ParseError::Cancelled { key });
            }

            let parsed = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if token.is_cancelled() {
                    return Err(ParseError::Cancelled {
                        key: record.key.clone(),
                    });
                }
                parser.parse(&record, &token)
            })
            .await;

            parsed.unwrap_or(Err(ParseError::Panicked { key }))
        });

        Ok(TaskHandle {
            key,
            cancel,
            handle,
            submitted_at: Instant::now(),
        })
    }

    /// Refuses further submissions. Parses already running keep their slots until they return.
    pub fn shutdown(&self) {
        if let Some(slots) = self.slots.get() {
            slots.close();
        }
    }
}

/// A submitted parse task.
pub struct TaskHandle {
    key: String,
    cancel: CancellationToken,
    handle: JoinHandle<Result<Document, ParseError>>,
    submitted_at: Instant,
}

impl TaskHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Waits up to `limit` from now. On timeout the task is cancelled and its result,
    /// should one still arrive, is dropped.
    pub async fn wait(mut self, limit: Duration) -> TaskOutcome {
        match timeout(limit, &mut self.handle).await {
            Ok(Ok(Ok(doc))) => TaskOutcome::Completed(doc),
            Ok(Ok(Err(err))) => TaskOutcome::Failed(err),
            Ok(Err(_)) => TaskOutcome::Failed(ParseError::Panicked { key: self.key }),
            Err(_) => {
                self.cancel.cancel();
                self.handle.abort();
                TaskOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    impl Parser for Echo {
        fn parse(&self, record: &Record, _: &CancellationToken) -> Result<Document, ParseError> {
            Ok(Document::new(record.key.clone()))
        }
    }

    struct Panics;

    impl Parser for Panics {
        fn parse(&self, _: &Record, _: &CancellationToken) -> Result<Document, ParseError> {
            panic!("parser bug")
        }
    }

    /// Spins until cancelled, counting how many parses noticed the cancellation.
    struct Stubborn {
        stopped: Arc<AtomicUsize>,
    }

    impl Parser for Stubborn {
        fn parse(
            &self,
            record: &Record,
            cancel: &CancellationToken,
        ) -> Result<Document, ParseError> {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Err(ParseError::Cancelled {
                key: record.key.clone(),
            })
        }
    }

    #[tokio::test]
    async fn pool_starts_lazily() {
        let pool = WorkerPool::new(3);
        assert!(!pool.is_started());
        assert_eq!(pool.available(), 3);

        let handle = pool.submit(Record::new("a", "x"), Arc::new(Echo)).await.unwrap();
        assert!(pool.is_started());
        assert!(matches!(
            handle.wait(Duration::from_secs(5)).await,
            TaskOutcome::Completed(doc) if doc.id() == "a"
        ));
    }

    #[tokio::test]
    async fn panicking_parser_is_a_failure() {
        let pool = WorkerPool::new(1);
        let handle = pool
            .submit(Record::new("boom", "x"), Arc::new(Panics))
            .await
            .unwrap();
        assert!(matches!(
            handle.wait(Duration::from_secs(5)).await,
            TaskOutcome::Failed(ParseError::Panicked { key }) if key == "boom"
        ));
    }

    #[tokio::test]
    async fn timeout_cancels_the_parse() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(1);
        let parser = Arc::new(Stubborn {
            stopped: stopped.clone(),
        });

        let handle = pool.submit(Record::new("slow", "x"), parser).await.unwrap();
        assert!(matches!(
            handle.wait(Duration::from_millis(50)).await,
            TaskOutcome::TimedOut
        ));

        // The cooperative parser notices the token and releases its slot.
        for _ in 0..200 {
            if stopped.load(Ordering::SeqCst) == 1 && pool.available() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn shut_down_pool_refuses_work() {
        let pool = WorkerPool::new(2);
        pool.submit(Record::new("a", "x"), Arc::new(Echo))
            .await
            .unwrap()
            .wait(Duration::from_secs(5))
            .await;
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert!(matches!(
            pool.submit(Record::new("b", "x"), Arc::new(Echo)).await,
            Err(ProcessingError::PoolClosed)
        ));
    }
}
