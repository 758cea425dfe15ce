use connectors::file::error::FileError;
use engine_config::{error::ReportGenerationError, settings::error::SettingsError};
use engine_core::error::ParseError;
use engine_runtime::error::SetupError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to set up the pipeline: {0}")]
    Setup(#[from] SetupError),

    #[error("Failed to write report: {0}")]
    Report(#[from] ReportGenerationError),

    #[error("Segment error: {0}")]
    Segment(#[from] FileError),

    #[error("Failed to parse file: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}
