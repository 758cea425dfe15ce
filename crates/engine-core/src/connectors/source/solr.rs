use crate::{
    connectors::source::{PartitionLocator, PartitionOpener, PartitionReader},
    error::SourceError,
};
use connectors::index::{error::IndexError, solr::SolrClient};
use model::records::record::Record;
use serde_json::{Map, Value as JsonValue};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, SyncSender},
    thread,
};
use tracing::{debug, warn};

pub const DEFAULT_QUERY: &str = "*:*";
pub const DEFAULT_PAGE_SIZE: usize = 1000;

type Page = Result<Vec<Record>, SourceError>;

/// Pages through the stored documents of a Solr core that match one query.
///
/// Every document becomes a record keyed by its `id`, with its stored fields serialized as
/// a JSON object for the payload. Pages are fetched on a background thread one page ahead
/// of the reader.
#[derive(Debug, Clone)]
pub struct SolrQueryOpener {
    client: SolrClient,
    query: String,
    start: u64,
    page_size: usize,
    fields: Vec<String>,
}

impl SolrQueryOpener {
    pub fn new(client: SolrClient) -> Self {
        SolrQueryOpener {
            client,
            query: DEFAULT_QUERY.to_string(),
            start: 0,
            page_size: DEFAULT_PAGE_SIZE,
            fields: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Restricts the stored fields fetched per document. Empty means all of them.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    async fn send_pages(self, partition: PathBuf, pages: SyncSender<Page>) {
        let url = self.client.base_url().to_string();
        let mut start = self.start;
        loop {
            let page = match self
                .client
                .select(&self.query, start, self.page_size, &self.fields)
                .await
            {
                Ok(page) => page,
                Err(source) => {
                    let _ = pages.send(Err(SourceError::Query { url, source }));
                    return;
                }
            };

            let fetched = page.docs.len() as u64;
            debug!(url = %url, start, fetched, found = page.num_found, "Fetched Solr page");
            let records = page
                .docs
                .into_iter()
                .filter_map(|doc| stored_record(doc, &partition))
                .collect();
            if pages.send(Ok(records)).is_err() {
                debug!(url = %url, "Reader closed, no more pages fetched");
                return;
            }

            start += fetched;
            if fetched == 0 || start >= page.num_found {
                return;
            }
        }
    }
}

impl PartitionOpener for SolrQueryOpener {
    fn open(&self, locator: &PartitionLocator) -> Result<Box<dyn PartitionReader>, SourceError> {
        let query_err = |err: std::io::Error| SourceError::Query {
            url: self.client.base_url().to_string(),
            source: IndexError::Io(err),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(query_err)?;
        let (sender, receiver) = mpsc::sync_channel(1);
        let fetcher = self.clone();
        let partition = locator.path.clone();
        thread::Builder::new()
            .name("solr-pages".into())
            .spawn(move || runtime.block_on(fetcher.send_pages(partition, sender)))
            .map_err(query_err)?;

        Ok(Box::new(SolrPageReader {
            partition: locator.path.clone(),
            pages: receiver,
            pending: Vec::new().into_iter(),
            done: false,
        }))
    }
}

struct SolrPageReader {
    partition: PathBuf,
    pages: Receiver<Page>,
    pending: std::vec::IntoIter<Record>,
    done: bool,
}

impl PartitionReader for SolrPageReader {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        loop {
            if let Some(record) = self.pending.next() {
                return Ok(Some(record));
            }
            if self.done {
                return Ok(None);
            }
            match self.pages.recv() {
                Ok(Ok(records)) => self.pending = records.into_iter(),
                Ok(Err(err)) => {
                    self.done = true;
                    return Err(err);
                }
                // The fetcher hung up after the last page.
                Err(_) => self.done = true,
            }
        }
    }

    fn path(&self) -> &Path {
        &self.partition
    }
}

fn stored_record(doc: Map<String, JsonValue>, partition: &Path) -> Option<Record> {
    let id = match doc.get("id") {
        Some(JsonValue::String(id)) => id.clone(),
        Some(JsonValue::Number(id)) => id.to_string(),
        _ => {
            warn!(partition = %partition.display(), "Stored document has no id, skipping");
            return None;
        }
    };
    match serde_json::to_vec(&doc) {
        Ok(payload) => Some(Record::new(id, payload).with_partition(partition)),
        Err(err) => {
            warn!(id = %id, error = %err, "Failed to serialize stored document, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn page(num_found: u64, start: u64, docs: JsonValue) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "response": { "numFound": num_found, "start": start, "docs": docs }
        }))
    }

    fn opener(server: &MockServer) -> SolrQueryOpener {
        let client = SolrClient::new(
            &format!("{}/solr/crawl", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        SolrQueryOpener::new(client).with_page_size(2)
    }

    fn read_all(reader: &mut Box<dyn PartitionReader>) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pages_until_every_match_is_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/crawl/select"))
            .and(query_param("start", "0"))
            .respond_with(page(
                3,
                0,
                json!([
                    { "id": "http://a/", "content": "alpha" },
                    { "title": "no id" }
                ]),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/crawl/select"))
            .and(query_param("start", "2"))
            .respond_with(page(3, 2, json!([{ "id": 7, "content": "gamma" }])))
            .expect(1)
            .mount(&server)
            .await;

        let opener = opener(&server);
        let locator = PartitionLocator::new(opener.client.base_url().as_str());
        let mut reader = opener.open(&locator).unwrap();
        let records = read_all(&mut reader);

        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["http://a/", "7"]);
        let payload: JsonValue = serde_json::from_slice(&records[0].payload).unwrap();
        assert_eq!(payload["content"], "alpha");
        assert_eq!(records[0].partition.as_deref(), Some(locator.path()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_page_ends_the_partition_with_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/crawl/select"))
            .and(query_param("start", "0"))
            .respond_with(page(
                4,
                0,
                json!([{ "id": "a" }, { "id": "b" }]),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/crawl/select"))
            .and(query_param("start", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("core is loading"))
            .mount(&server)
            .await;

        let opener = opener(&server);
        let mut reader = opener
            .open(&PartitionLocator::new(opener.client.base_url().as_str()))
            .unwrap();

        assert_eq!(reader.next_record().unwrap().unwrap().key, "a");
        assert_eq!(reader.next_record().unwrap().unwrap().key, "b");
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, SourceError::Query { .. }));
        assert!(err.to_string().contains("core is loading"));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_result_has_no_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/crawl/select"))
            .and(query_param("q", "host:nowhere"))
            .respond_with(page(0, 0, json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let opener = opener(&server).with_query("host:nowhere");
        let mut reader = opener
            .open(&PartitionLocator::new(opener.client.base_url().as_str()))
            .unwrap();
        assert!(read_all(&mut reader).is_empty());
    }
}
