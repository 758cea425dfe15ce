use connectors::{error::ConnectorError, file::error::FileError, index::error::IndexError};
use engine_config::settings::error::SettingsError;
use engine_core::error::SinkError;
use engine_processing::error::ProcessingError;
use thiserror::Error;

/// Errors that stop a run before any record is read.
///
/// Once the pipeline is running, source, parse and sink failures are counted and
/// reported in the summary instead.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Settings failed validation.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// An input list or segment list could not be read.
    #[error("Cannot read input {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: FileError,
    },

    /// Credentials file could not be loaded or lacks a required key.
    #[error("Credentials error: {0}")]
    Credentials(#[from] ConnectorError),

    /// The field mapping file could not be loaded.
    #[error("Field map error: {0}")]
    FieldMap(#[source] FileError),

    /// The sink client could not be built.
    #[error("Sink setup error: {0}")]
    Sink(#[from] SinkError),

    #[error("Index client error: {0}")]
    Index(#[from] IndexError),

    #[error("Pipeline error: {0}")]
    Processing(#[from] ProcessingError),
}

impl SetupError {
    pub fn input(path: impl AsRef<std::path::Path>, source: FileError) -> Self {
        SetupError::Input {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
