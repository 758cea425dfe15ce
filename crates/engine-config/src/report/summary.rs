use crate::error::ReportGenerationError;
use chrono::{DateTime, Utc};
use engine_core::{metrics::MetricsSnapshot, progress::ProgressStage};
use serde::Serialize;
use std::{fs, path::Path};
use uuid::Uuid;

/// Final account of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub stage: ProgressStage,
    /// The run stopped pulling records early because of an interrupt
    pub interrupted: bool,
    pub commit_ok: bool,
    pub counters: MetricsSnapshot,
    pub docs_per_sec: f64,
}

impl RunSummary {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        stage: ProgressStage,
        counters: MetricsSnapshot,
    ) -> Self {
        let finished_at = Utc::now();
        let elapsed_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        let docs_per_sec = if elapsed_ms == 0 {
            0.0
        } else {
            counters.documents_written as f64 * 1000.0 / elapsed_ms as f64
        };

        RunSummary {
            run_id,
            started_at,
            finished_at,
            elapsed_ms,
            stage,
            interrupted: false,
            commit_ok: true,
            counters,
            docs_per_sec,
        }
    }

    pub fn with_interrupted(mut self, interrupted: bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub fn with_commit_ok(mut self, commit_ok: bool) -> Self {
        self.commit_ok = commit_ok;
        self
    }

    /// Documents that left the pipeline without reaching the index.
    pub fn documents_missing(&self) -> u64 {
        self.counters.documents_rejected + self.counters.documents_lost
    }

    pub fn to_json(&self) -> Result<String, ReportGenerationError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ReportGenerationError::GenerationFailed(err.to_string()))
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ReportGenerationError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ReportGenerationError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_report_file() {
        let counters = MetricsSnapshot {
            records_seen: 4,
            succeeded: 3,
            failed: 1,
            documents_written: 2,
            documents_rejected: 1,
            ..Default::default()
        };
        let summary = RunSummary::new(Uuid::new_v4(), Utc::now(), ProgressStage::Done, counters)
            .with_interrupted(true);
        assert_eq!(summary.documents_missing(), 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        summary.write_to(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["stage"], "Done");
        assert_eq!(json["interrupted"], true);
        assert_eq!(json["counters"]["records_seen"], 4);
    }
}
