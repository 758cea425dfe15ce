use crate::{
    connectors::sink::{BulkResponse, Sink},
    error::SinkError,
};
use async_trait::async_trait;
use connectors::index::{mapping::FieldMapper, solr::SolrClient};
use model::records::document::Document;
use tracing::debug;

/// Writes documents to a Solr core, mapping field names onto its dynamic fields.
pub struct SolrSink {
    client: SolrClient,
    mapper: FieldMapper,
}

impl SolrSink {
    pub fn new(client: SolrClient, mapper: FieldMapper) -> Self {
        SolrSink { client, mapper }
    }
}

#[async_trait]
impl Sink for SolrSink {
    fn name(&self) -> &str {
        "solr"
    }

    async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError> {
        let mapped: Vec<_> = docs
            .iter()
            .map(|doc| serde_json::Value::Object(self.mapper.map_document(doc)))
            .collect();
        self.client.add(&mapped).await?;
        Ok(BulkResponse::all_accepted(docs.len()))
    }

    async fn write_one(&self, doc: &Document) -> Result<(), SinkError> {
        let mapped = serde_json::Value::Object(self.mapper.map_document(doc));
        self.client.add(std::slice::from_ref(&mapped)).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), SinkError> {
        debug!(url = %self.client.base_url(), "Committing Solr core");
        self.client.commit().await?;
        Ok(())
    }
}
