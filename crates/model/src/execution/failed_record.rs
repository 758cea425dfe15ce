use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record or document that did not make it into the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub run_id: Option<String>,
    pub key: String,
    pub stage: FailureStage,
    pub error: FailureError,
    pub partition: Option<String>,
    pub failed_at: DateTime<Utc>,
}

/// Where in the pipeline the failure happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Partition could not be opened or a record could not be read
    Source,

    /// Parser returned an error or the worker panicked
    Parse,

    /// Parser exceeded the per-task timeout
    Timeout,

    /// Sink rejected the document or the degraded write failed
    Sink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureError {
    pub error_type: String,
    pub message: String,
    pub is_retryable: bool,
}

impl FailedRecord {
    pub fn new(
        stage: FailureStage,
        key: impl Into<String>,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: None,
            key: key.into(),
            stage,
            error: FailureError {
                error_type: error_type.into(),
                message: message.into(),
                is_retryable: false,
            },
            partition: None,
            failed_at: Utc::now(),
        }
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        let partition = partition.into();
        if !partition.is_empty() {
            self.partition = Some(partition);
        }
        self
    }

    /// Mark the failure as transient (the document was lost, not rejected)
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.error.is_retryable = retryable;
        self
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Source => write!(f, "source"),
            FailureStage::Parse => write!(f, "parse"),
            FailureStage::Timeout => write!(f, "timeout"),
            FailureStage::Sink => write!(f, "sink"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_creation() {
        let failed = FailedRecord::new(
            FailureStage::Parse,
            "http://example.com/a",
            "ParseError",
            "unsupported encoding",
        );

        assert_eq!(failed.key, "http://example.com/a");
        assert_eq!(failed.stage, FailureStage::Parse);
        assert_eq!(failed.error.error_type, "ParseError");
        assert!(!failed.error.is_retryable);
        assert!(failed.run_id.is_none());
        assert!(!failed.id.is_empty());
    }

    #[test]
    fn test_failed_record_with_context() {
        let failed = FailedRecord::new(FailureStage::Sink, "k", "SinkError", "503")
            .with_run("run-1")
            .with_partition("/segs/0001/data")
            .with_retryable(true);

        assert_eq!(failed.run_id.as_deref(), Some("run-1"));
        assert_eq!(failed.partition.as_deref(), Some("/segs/0001/data"));
        assert!(failed.error.is_retryable);
    }

    #[test]
    fn test_empty_partition_is_ignored() {
        let failed =
            FailedRecord::new(FailureStage::Timeout, "k", "Timeout", "15s").with_partition("");
        assert!(failed.partition.is_none());
    }

    #[test]
    fn test_json_line() {
        let line = FailedRecord::new(FailureStage::Timeout, "k", "Timeout", "15s")
            .to_json_line()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["stage"], "timeout");
        assert_eq!(parsed["key"], "k");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_failure_stage_display() {
        assert_eq!(FailureStage::Source.to_string(), "source");
        assert_eq!(FailureStage::Parse.to_string(), "parse");
        assert_eq!(FailureStage::Timeout.to_string(), "timeout");
        assert_eq!(FailureStage::Sink.to_string(), "sink");
    }
}
