//! Re-parsing of documents already stored in an index.

use crate::parse::{ContentParser, check};
use chrono::Utc;
use engine_core::{error::ParseError, parser::Parser};
use model::{
    core::value::Value,
    records::{document::Document, record::Record},
};
use serde_json::{Map, Value as JsonValue};
use tokio_util::sync::CancellationToken;

/// Stored fields whose text is analyzed again.
const TEXT_FIELDS: [&str; 2] = ["title", "content"];

/// Parses records whose payload is a stored document: a JSON object of field values.
///
/// Stored fields are copied unchanged. The text of the `title` and `content` fields is
/// run through [`ContentParser`] and every field it derives that the stored document
/// lacks is added, so documents indexed by older runs gain the fields they miss.
/// `indexed_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct StoredDocumentParser {
    content: ContentParser,
}

impl StoredDocumentParser {
    pub fn new() -> Self {
        StoredDocumentParser::default()
    }
}

impl Parser for StoredDocumentParser {
    fn name(&self) -> &str {
        "stored"
    }

    fn parse(&self, record: &Record, cancel: &CancellationToken) -> Result<Document, ParseError> {
        let stored: Map<String, JsonValue> =
            serde_json::from_slice(&record.payload).map_err(|err| ParseError::Malformed {
                key: record.key.clone(),
                reason: format!("stored document is not a JSON object: {err}"),
            })?;

        let doc = Document::new(record.key.clone()).with_fields(
            stored
                .iter()
                .filter(|(name, _)| name.as_str() != "id")
                .map(|(name, value)| (name.clone(), Value::from_json(value))),
        );
        check(cancel, &record.key)?;

        let text = TEXT_FIELDS
            .iter()
            .filter_map(|field| stored.get(*field))
            .filter_map(text_of)
            .collect::<Vec<_>>()
            .join("\n");
        let derived = self
            .content
            .parse(&Record::new(record.key.clone(), text), cancel)?;

        let missing: Vec<(String, Value)> = derived
            .fields()
            .iter()
            .filter(|(name, _)| doc.get(name).is_none())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(doc.with_fields(missing).with_field("indexed_at", Utc::now()))
    }
}

fn text_of(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(JsonValue::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: &str, stored: JsonValue) -> Record {
        Record::new(key, serde_json::to_vec(&stored).unwrap())
    }

    #[test]
    fn stored_fields_are_kept_and_gaps_filled() {
        let stored = json!({
            "id": "http://shop.example/item/1",
            "title": "Item one",
            "content": "A fine item",
            "content_type": "text/html",
            "price": 12,
            "indexed_at": "2015-10-27T10:00:00Z"
        });
        let doc = StoredDocumentParser::new()
            .parse(
                &record("http://shop.example/item/1", stored),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(doc.id(), "http://shop.example/item/1");
        assert!(doc.get("id").is_none());
        assert_eq!(doc.get("title").and_then(Value::as_str), Some("Item one"));
        assert_eq!(doc.get("content").and_then(Value::as_str), Some("A fine item"));
        assert_eq!(doc.get("content_type").and_then(Value::as_str), Some("text/html"));
        assert_eq!(doc.get("price"), Some(&Value::Int(12)));
        assert_eq!(doc.get("host").and_then(Value::as_str), Some("shop.example"));
        assert!(doc.get("content_hash").is_some());
        match doc.get("indexed_at") {
            Some(Value::Timestamp(ts)) => assert!(ts.timestamp() > 1_445_940_000),
            other => panic!("unexpected indexed_at: {other:?}"),
        }
    }

    #[test]
    fn payload_that_is_not_an_object_is_malformed() {
        let result = StoredDocumentParser::new().parse(
            &Record::new("http://a/", b"[1, 2]".to_vec()),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn cancelled_parse_stops() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = StoredDocumentParser::new()
            .parse(&record("http://a/", json!({ "content": "x" })), &cancel);
        assert!(matches!(result, Err(ParseError::Cancelled { .. })));
    }

    #[test]
    fn list_fields_contribute_their_text() {
        assert_eq!(
            text_of(&json!(["one", 2, "three"])).as_deref(),
            Some("one three")
        );
        assert_eq!(text_of(&json!(5)), None);
    }
}
