use crate::error::FailedRecordWriterError;
use connectors::index::jsonl::JsonLinesWriter;
use model::execution::failed_record::FailedRecord;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Appends failed records to a JSON-lines log.
///
/// The file is only created once the first failure arrives, so clean runs leave nothing
/// behind.
pub struct FailedRecordWriter {
    path: PathBuf,
    run_id: String,
    writer: OnceCell<Mutex<JsonLinesWriter>>,
}

impl FailedRecordWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
            writer: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, failed: FailedRecord) -> Result<(), FailedRecordWriterError> {
        self.write_batch(vec![failed]).await
    }

    pub async fn write_batch(
        &self,
        failed: Vec<FailedRecord>,
    ) -> Result<(), FailedRecordWriterError> {
        if failed.is_empty() {
            return Ok(());
        }

        let writer = self
            .writer
            .get_or_try_init(|| async {
                let writer = JsonLinesWriter::open(&self.path)?;
                info!(path = %self.path.display(), "Opened failed-record log");
                Ok::<_, FailedRecordWriterError>(Mutex::new(writer))
            })
            .await?;

        let mut writer = writer.lock().await;
        let count = failed.len();
        for record in failed {
            let record = record.with_run(self.run_id.clone());
            writer
                .append(&record)
                .map_err(|err| FailedRecordWriterError::Append(err.to_string()))?;
        }
        writer
            .sync()
            .map_err(|err| FailedRecordWriterError::Append(err.to_string()))?;

        debug!(count, path = %self.path.display(), "Wrote failed records");
        Ok(())
    }
}
