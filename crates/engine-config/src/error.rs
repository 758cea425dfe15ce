use thiserror::Error;

/// Errors raised while delivering the run report.
#[derive(Debug, Error)]
pub enum ReportGenerationError {
    #[error("Failed to generate report: {0}")]
    GenerationFailed(String),

    #[error("Missing REPORT_CALLBACK_URL environment variable")]
    MissingCallbackUrl,

    #[error("Missing AUTH_TOKEN environment variable")]
    MissingAuthToken,

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
