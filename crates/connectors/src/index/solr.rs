use crate::index::{endpoint, ensure_success, error::IndexError, http_client};
use reqwest::Url;
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

/// One page of a `select` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolrPage {
    /// Documents matching the query, across all pages
    pub num_found: u64,
    pub start: u64,
    pub docs: Vec<Map<String, JsonValue>>,
}

/// Minimal client for a Solr core's JSON update and select handlers.
#[derive(Debug, Clone)]
pub struct SolrClient {
    http: reqwest::Client,
    base: Url,
}

impl SolrClient {
    /// `base_url` is the core URL, e.g. `http://localhost:8983/solr/collection1`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IndexError> {
        let base = Url::parse(base_url).map_err(|_| IndexError::InvalidUrl(base_url.into()))?;
        Ok(SolrClient {
            http: http_client(timeout)?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Adds (or replaces) documents. Solr applies the whole request or none of it.
    pub async fn add(&self, docs: &[JsonValue]) -> Result<(), IndexError> {
        let url = endpoint(&self.base, &["update"])?;
        debug!(url = %url, docs = docs.len(), "Posting documents to Solr");
        let response = self.http.post(url).json(docs).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Hard commit, making every added document visible to searchers.
    pub async fn commit(&self) -> Result<(), IndexError> {
        let mut url = endpoint(&self.base, &["update"])?;
        url.query_pairs_mut().append_pair("commit", "true");
        let response = self
            .http
            .post(url)
            .json(&JsonValue::Array(Vec::new()))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Fetches `rows` stored documents matching `query`, starting at offset `start`.
    ///
    /// An empty `fields` list returns every stored field.
    pub async fn select(
        &self,
        query: &str,
        start: u64,
        rows: usize,
        fields: &[String],
    ) -> Result<SolrPage, IndexError> {
        let mut url = endpoint(&self.base, &["select"])?;
        {
            let mut params = url.query_pairs_mut();
            params
                .append_pair("q", query)
                .append_pair("start", &start.to_string())
                .append_pair("rows", &rows.to_string())
                .append_pair("wt", "json");
            if !fields.is_empty() {
                params.append_pair("fl", &fields.join(","));
            }
        }
        debug!(url = %url, "Querying Solr");
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let body: JsonValue = response.json().await?;
        parse_page(&body)
    }
}

fn parse_page(body: &JsonValue) -> Result<SolrPage, IndexError> {
    let response = body
        .get("response")
        .ok_or_else(|| IndexError::Decode("select response has no `response` object".into()))?;
    let num_found = response
        .get("numFound")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| IndexError::Decode("select response has no `numFound`".into()))?;
    let docs = response
        .get("docs")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| IndexError::Decode("select response has no `docs` array".into()))?
        .iter()
        .filter_map(|doc| doc.as_object().cloned())
        .collect();

    Ok(SolrPage {
        num_found,
        start: response
            .get("start")
            .and_then(JsonValue::as_u64)
            .unwrap_or(0),
        docs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path, query_param},
    };

    #[tokio::test]
    async fn add_posts_json_array_to_update_handler() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solr/core1/update"))
            .and(body_json(json!([{ "id": "a" }, { "id": "b" }])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            SolrClient::new(&format!("{}/solr/core1/", server.uri()), Duration::from_secs(5))
                .unwrap();
        client
            .add(&[json!({ "id": "a" }), json!({ "id": "b" })])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solr/core1/update"))
            .respond_with(ResponseTemplate::new(400).set_body_string("undefined field foo"))
            .mount(&server)
            .await;

        let client =
            SolrClient::new(&format!("{}/solr/core1", server.uri()), Duration::from_secs(5))
                .unwrap();
        let err = client.commit().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("undefined field foo"));
    }

    #[tokio::test]
    async fn commit_uses_commit_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solr/core1/update"))
            .and(query_param("commit", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            SolrClient::new(&format!("{}/solr/core1", server.uri()), Duration::from_secs(5))
                .unwrap();
        client.commit().await.unwrap();
    }

    #[tokio::test]
    async fn select_reads_one_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/select"))
            .and(query_param("q", "host:example.com"))
            .and(query_param("start", "10"))
            .and(query_param("rows", "2"))
            .and(query_param("fl", "id,content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "numFound": 12,
                    "start": 10,
                    "docs": [
                        { "id": "http://example.com/a", "content": "alpha" },
                        { "id": "http://example.com/b", "content": "beta" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client =
            SolrClient::new(&format!("{}/solr/core1", server.uri()), Duration::from_secs(5))
                .unwrap();
        let page = client
            .select(
                "host:example.com",
                10,
                2,
                &["id".to_string(), "content".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(page.num_found, 12);
        assert_eq!(page.start, 10);
        assert_eq!(page.docs.len(), 2);
        assert_eq!(page.docs[1]["content"], "beta");
    }

    #[test]
    fn page_without_docs_is_a_decode_error() {
        let err = parse_page(&json!({ "response": { "numFound": 3 } })).unwrap_err();
        assert!(matches!(err, IndexError::Decode(_)));
    }
}
