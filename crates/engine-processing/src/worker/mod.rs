pub mod pool;
pub mod supervisor;

use engine_core::error::ParseError;
use model::records::document::Document;

/// Result of waiting on one parse task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Document),
    Failed(ParseError),
    TimedOut,
}
