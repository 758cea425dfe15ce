use serde::Serialize;
use std::fmt;

/// Lifecycle of one pipeline run. Transitions only move forward:
/// `Idle -> Running -> Draining -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Draining,
    Done,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "Idle",
            ProgressStage::Running => "Running",
            ProgressStage::Draining => "Draining",
            ProgressStage::Done => "Done",
        }
    }

    /// The stage that follows this one, or `None` once done.
    pub fn next(&self) -> Option<ProgressStage> {
        match self {
            ProgressStage::Idle => Some(ProgressStage::Running),
            ProgressStage::Running => Some(ProgressStage::Draining),
            ProgressStage::Draining => Some(ProgressStage::Done),
            ProgressStage::Done => None,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
