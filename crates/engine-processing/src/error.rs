use connectors::file::error::FileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Group size must be at least 1")]
    InvalidGroupSize,

    #[error("Worker pool is shut down")]
    PoolClosed,
}

#[derive(Error, Debug)]
pub enum FailedRecordWriterError {
    #[error("Failed to open failed-record log: {0}")]
    Open(#[from] FileError),

    #[error("Failed to append failed record: {0}")]
    Append(String),
}
