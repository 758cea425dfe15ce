use crate::error::SinkError;
use async_trait::async_trait;
use model::records::document::Document;

pub mod elastic;
pub mod file;
pub mod solr;

/// A document the sink refused for a reason resubmission would not fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub id: String,
    pub reason: String,
}

/// Outcome of a bulk write the sink accepted as a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub accepted: usize,
    pub rejected: Vec<Rejection>,
}

impl BulkResponse {
    pub fn all_accepted(count: usize) -> Self {
        BulkResponse {
            accepted: count,
            rejected: Vec::new(),
        }
    }
}

/// Destination for parsed documents.
///
/// Bulk and single-item writes have the same effect; they differ only in atomicity and
/// throughput. `commit` makes earlier writes durable or visible and may be a no-op.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError>;

    async fn write_one(&self, doc: &Document) -> Result<(), SinkError>;

    async fn commit(&self) -> Result<(), SinkError>;
}
