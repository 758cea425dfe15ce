use crate::{file::error::FileError, index::error::IndexError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// File-related error.
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// Index client error.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Malformed credentials or properties file.
    #[error("Invalid properties file {path}: {reason}")]
    InvalidProperties { path: String, reason: String },

    /// Missing required property error.
    #[error("Missing required property: {0}")]
    MissingProperty(String),
}
