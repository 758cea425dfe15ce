use crate::{
    connectors::sink::{BulkResponse, Rejection, Sink},
    error::SinkError,
};
use async_trait::async_trait;
use connectors::index::elastic::ElasticClient;
use model::records::document::Document;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

const MISSING_ID: &str = "No ID set to document. Skipped";

/// Writes documents to one Elasticsearch index through the bulk API.
pub struct ElasticSink {
    client: ElasticClient,
}

impl ElasticSink {
    pub fn new(client: ElasticClient) -> Self {
        ElasticSink { client }
    }
}

fn source_of(doc: &Document) -> Map<String, JsonValue> {
    doc.fields()
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

#[async_trait]
impl Sink for ElasticSink {
    fn name(&self) -> &str {
        "elastic"
    }

    async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError> {
        let mut rejected = Vec::new();
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            if doc.id().is_empty() {
                warn!("{MISSING_ID}");
                rejected.push(Rejection {
                    id: String::new(),
                    reason: MISSING_ID.to_string(),
                });
                continue;
            }
            items.push((doc.id().to_string(), source_of(doc)));
        }

        if items.is_empty() {
            return Ok(BulkResponse {
                accepted: 0,
                rejected,
            });
        }

        let failures = self.client.bulk(&items).await?;

        // A throttled or failed shard fails the whole request so the caller backs off and
        // resubmits item by item; writes are keyed by id, so repeats overwrite.
        if let Some(transient) = failures.iter().find(|f| f.is_transient()) {
            return Err(SinkError::Status {
                status: transient.status,
                message: format!("bulk item {} failed: {}", transient.id, transient.reason),
            });
        }

        let Some(accepted) = items.len().checked_sub(failures.len()) else {
            return Err(SinkError::Other(format!(
                "bulk response reports {} failures for {} documents",
                failures.len(),
                items.len()
            )));
        };
        rejected.extend(failures.into_iter().map(|f| Rejection {
            id: f.id,
            reason: f.reason,
        }));
        Ok(BulkResponse { accepted, rejected })
    }

    async fn write_one(&self, doc: &Document) -> Result<(), SinkError> {
        if doc.id().is_empty() {
            return Err(SinkError::Rejected {
                id: String::new(),
                reason: MISSING_ID.to_string(),
            });
        }
        self.client.index_one(doc.id(), &source_of(doc)).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), SinkError> {
        self.client.refresh().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn sink(server: &MockServer) -> ElasticSink {
        ElasticSink::new(
            ElasticClient::new(&server.uri(), "crawl", Duration::from_secs(5)).unwrap(),
        )
    }

    #[tokio::test]
    async fn item_rejections_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "a", "status": 201 } },
                    { "index": { "_id": "b", "status": 400,
                        "error": { "type": "mapper_parsing_exception", "reason": "bad" } } }
                ]
            })))
            .mount(&server)
            .await;

        let docs = vec![Document::new("a"), Document::new("b"), Document::new("")];
        let response = sink(&server).write_batch(&docs).await.unwrap();
        assert_eq!(response.accepted, 1);
        assert_eq!(response.rejected.len(), 2);
        assert_eq!(response.rejected[0].reason, MISSING_ID);
        assert_eq!(response.rejected[1].id, "b");
    }

    #[tokio::test]
    async fn bulk_response_with_extra_failures_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "a", "status": 400,
                        "error": { "type": "mapper_parsing_exception", "reason": "bad" } } },
                    { "index": { "_id": "ghost", "status": 400,
                        "error": { "type": "mapper_parsing_exception", "reason": "bad" } } }
                ]
            })))
            .mount(&server)
            .await;

        let err = sink(&server)
            .write_batch(&[Document::new("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Other(_)));
        assert!(err.to_string().contains("2 failures for 1 documents"));
    }

    #[tokio::test]
    async fn throttled_item_fails_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "a", "status": 429,
                        "error": { "type": "es_rejected_execution_exception", "reason": "full" } } }
                ]
            })))
            .mount(&server)
            .await;

        let err = sink(&server)
            .write_batch(&[Document::new("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn single_write_without_id_is_rejected() {
        let server = MockServer::start().await;
        let err = sink(&server)
            .write_one(&Document::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected { .. }));
    }

    #[tokio::test]
    async fn commit_refreshes_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crawl/_refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        sink(&server).commit().await.unwrap();
    }
}
