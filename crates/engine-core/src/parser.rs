use crate::error::ParseError;
use model::records::{document::Document, record::Record};
use tokio_util::sync::CancellationToken;

/// Turns a raw record into a document.
///
/// Implementations are called from several worker threads at once and run on the
/// blocking pool. `cancel` fires when the supervisor gives up on the task; checking it
/// between expensive steps lets a slow parse end early, but nothing forces it to.
pub trait Parser: Send + Sync {
    fn name(&self) -> &str {
        "parser"
    }

    fn parse(&self, record: &Record, cancel: &CancellationToken) -> Result<Document, ParseError>;
}
