use thiserror::Error;

/// Errors raised when loading or validating the run configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape.
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// One or more settings failed validation.
    #[error("Invalid settings: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
}
