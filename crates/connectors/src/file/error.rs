use std::{io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
    #[error("Corrupt entry in {path} at byte {offset}: {reason}")]
    Corrupt {
        path: String,
        offset: u64,
        reason: String,
    },
    #[error("Entry too large in {path}: {len} bytes exceeds {max}")]
    TooLarge { path: String, len: u64, max: u64 },
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
}

impl FileError {
    /// Maps an I/O error raised while opening `path` to a more specific variant.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                FileError::PermissionDenied(path.display().to_string())
            }
            _ => FileError::IoError(err),
        }
    }
}
