use crate::{
    connectors::sink::{BulkResponse, Sink},
    error::SinkError,
};
use async_trait::async_trait;
use connectors::index::jsonl::JsonLinesWriter;
use model::records::document::Document;
use std::path::Path;
use tokio::sync::Mutex;

/// Appends documents to a local JSON-lines file. `commit` syncs the file.
pub struct JsonLinesSink {
    writer: Mutex<JsonLinesWriter>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let writer =
            JsonLinesWriter::open(path).map_err(|err| SinkError::Other(err.to_string()))?;
        Ok(JsonLinesSink {
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn write_batch(&self, docs: &[Document]) -> Result<BulkResponse, SinkError> {
        let mut writer = self.writer.lock().await;
        for doc in docs {
            writer.append(doc)?;
        }
        Ok(BulkResponse::all_accepted(docs.len()))
    }

    async fn write_one(&self, doc: &Document) -> Result<(), SinkError> {
        self.writer.lock().await.append(doc)?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), SinkError> {
        self.writer.lock().await.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_documents_as_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        let sink = JsonLinesSink::open(&path).unwrap();

        sink.write_batch(&[
            Document::new("a").with_field("title", "A"),
            Document::new("b"),
        ])
        .await
        .unwrap();
        sink.write_one(&Document::new("c")).await.unwrap();
        sink.commit().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let docs: Vec<Document> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id(), "a");
        assert_eq!(docs[0].get("title").and_then(|v| v.as_str()), Some("A"));
    }
}
