use crate::index::{endpoint, ensure_success, error::IndexError, http_client};
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use std::{collections::HashMap, time::Duration};
use tracing::debug;

/// Client for the Elasticsearch document and bulk APIs, bound to one index.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    http: reqwest::Client,
    base: Url,
    index: String,
    auth: Option<(String, String)>,
}

/// One bulk item the cluster did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemError {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

impl BulkItemError {
    /// Throttling and server-side failures can succeed on resubmission.
    pub fn is_transient(&self) -> bool {
        self.status == 429 || self.status >= 500
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponseBody {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItemBody>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemBody {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<JsonValue>,
}

impl ElasticClient {
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> Result<Self, IndexError> {
        let base = Url::parse(base_url).map_err(|_| IndexError::InvalidUrl(base_url.into()))?;
        Ok(ElasticClient {
            http: http_client(timeout)?,
            base,
            index: index.to_string(),
            auth: None,
        })
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Sends `(id, source)` pairs through `_bulk` and returns the items that failed.
    pub async fn bulk(
        &self,
        docs: &[(String, Map<String, JsonValue>)],
    ) -> Result<Vec<BulkItemError>, IndexError> {
        let body = bulk_body(&self.index, docs)?;
        let url = endpoint(&self.base, &["_bulk"])?;
        debug!(url = %url, docs = docs.len(), "Sending bulk request");

        let request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response = ensure_success(self.authorize(request).send().await?).await?;
        let text = response.text().await?;
        parse_bulk_response(&text)
    }

    pub async fn index_one(
        &self,
        id: &str,
        source: &Map<String, JsonValue>,
    ) -> Result<(), IndexError> {
        let url = endpoint(&self.base, &[self.index.as_str(), "_doc", id])?;
        let request = self.http.put(url).json(source);
        ensure_success(self.authorize(request).send().await?).await?;
        Ok(())
    }

    /// Makes recent writes visible to search.
    pub async fn refresh(&self) -> Result<(), IndexError> {
        let url = endpoint(&self.base, &[self.index.as_str(), "_refresh"])?;
        let request = self.http.post(url);
        ensure_success(self.authorize(request).send().await?).await?;
        Ok(())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }
}

fn bulk_body(
    index: &str,
    docs: &[(String, Map<String, JsonValue>)],
) -> Result<String, IndexError> {
    let mut body = String::new();
    for (id, source) in docs {
        let action = json!({ "index": { "_index": index, "_id": id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(source)?);
        body.push('\n');
    }
    Ok(body)
}

/// Extracts failed items from a `_bulk` response body.
pub fn parse_bulk_response(body: &str) -> Result<Vec<BulkItemError>, IndexError> {
    let parsed: BulkResponseBody =
        serde_json::from_str(body).map_err(|err| IndexError::Decode(err.to_string()))?;
    if !parsed.errors {
        return Ok(Vec::new());
    }

    let failures = parsed
        .items
        .into_iter()
        .flat_map(|item| item.into_values())
        .filter(|item| item.error.is_some() || item.status >= 300)
        .map(|item| BulkItemError {
            id: item.id.unwrap_or_default(),
            status: item.status,
            reason: item
                .error
                .as_ref()
                .map(error_reason)
                .unwrap_or_else(|| format!("status {}", item.status)),
        })
        .collect();
    Ok(failures)
}

fn error_reason(error: &JsonValue) -> String {
    match error {
        JsonValue::Object(obj) => {
            let kind = obj.get("type").and_then(JsonValue::as_str).unwrap_or("error");
            let reason = obj.get("reason").and_then(JsonValue::as_str).unwrap_or("");
            format!("{kind}: {reason}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[test]
    fn parses_item_failures() {
        let body = r#"{
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "crawl", "_id": "a", "status": 201}},
                {"index": {"_index": "crawl", "_id": "b", "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "bad date"}}},
                {"index": {"_index": "crawl", "_id": "c", "status": 429,
                    "error": {"type": "es_rejected_execution_exception", "reason": "queue full"}}}
            ]
        }"#;

        let failures = parse_bulk_response(body).unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].id, "b");
        assert_eq!(failures[0].reason, "mapper_parsing_exception: bad date");
        assert!(!failures[0].is_transient());
        assert!(failures[1].is_transient());
    }

    #[test]
    fn clean_response_has_no_failures() {
        let body = r#"{"took": 1, "errors": false, "items": []}"#;
        assert!(parse_bulk_response(body).unwrap().is_empty());
        assert!(matches!(
            parse_bulk_response("not json"),
            Err(IndexError::Decode(_))
        ));
    }

    #[test]
    fn bulk_body_is_ndjson() {
        let mut source = Map::new();
        source.insert("title".into(), json!("T"));
        let body = bulk_body("crawl", &[("a".to_string(), source)]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<JsonValue>(lines[0]).unwrap(),
            json!({ "index": { "_index": "crawl", "_id": "a" } })
        );
        assert!(body.ends_with('\n'));
    }

    #[tokio::test]
    async fn index_one_encodes_id_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/crawl/_doc/http:%2F%2Fa.com%2Fx"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = ElasticClient::new(&server.uri(), "crawl", Duration::from_secs(5))
            .unwrap()
            .with_basic_auth("user", "pass");
        client
            .index_one("http://a.com/x", &Map::new())
            .await
            .unwrap();
    }
}
