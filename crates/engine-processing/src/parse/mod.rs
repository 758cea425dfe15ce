//! Default parser: content type detection plus HTML and plain-text extraction.

pub mod html;
pub mod sniff;
pub mod stored;

use crate::parse::sniff::{MediaType, sniff};
use chrono::Utc;
use engine_core::{error::ParseError, parser::Parser};
use model::records::{document::Document, record::Record};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Builds a document from a raw fetched page or file.
///
/// Every document carries the envelope fields (`url`, `host`, `content_type`, `main_type`,
/// `sub_type`, `content_length`, `content_hash`, `indexed_at`). HTML adds `title`,
/// `content`, `outlinks`, `outpaths` and one `meta.<name>` field per `<meta>` tag; other
/// text adds `content`. Binary payloads keep only the envelope.
#[derive(Debug, Clone, Default)]
pub struct ContentParser;

impl ContentParser {
    pub fn new() -> Self {
        ContentParser
    }

    fn envelope(record: &Record, media: &MediaType, url: Option<&Url>) -> Document {
        Document::new(record.key.clone())
            .with_field("url", record.key.as_str())
            .with_field("host", url.and_then(Url::host_str))
            .with_field("content_type", media.to_string())
            .with_field("main_type", media.main.as_str())
            .with_field("sub_type", media.sub.as_str())
            .with_field("content_length", record.len())
            .with_field("content_hash", blake3::hash(&record.payload).to_hex().to_string())
            .with_field("indexed_at", Utc::now())
    }
}

fn check(cancel: &CancellationToken, key: &str) -> Result<(), ParseError> {
    if cancel.is_cancelled() {
        Err(ParseError::Cancelled {
            key: key.to_string(),
        })
    } else {
        Ok(())
    }
}

impl Parser for ContentParser {
    fn name(&self) -> &str {
        "content"
    }

    fn parse(&self, record: &Record, cancel: &CancellationToken) -> Result<Document, ParseError> {
        if record.key.trim().is_empty() {
            return Err(ParseError::Malformed {
                key: record.key.clone(),
                reason: "record has no key".to_string(),
            });
        }

        let media = sniff(&record.payload, &record.key);
        let url = Url::parse(&record.key).ok();
        let doc = Self::envelope(record, &media, url.as_ref());
        check(cancel, &record.key)?;

        if media.is_html() {
            let markup = String::from_utf8_lossy(&record.payload);
            let extracted = html::extract(&markup, url.as_ref());
            check(cancel, &record.key)?;

            let outpaths: Vec<String> = extracted
                .outlinks
                .iter()
                .filter_map(|link| Url::parse(link).ok())
                .map(|link| link.path().to_string())
                .filter(|path| path != "/")
                .collect();

            let mut doc = doc
                .with_field("title", extracted.title)
                .with_field("content", non_empty(extracted.text));
            if !extracted.outlinks.is_empty() {
                doc = doc.with_field("outlinks", extracted.outlinks);
            }
            if !outpaths.is_empty() {
                doc = doc.with_field("outpaths", outpaths);
            }
            let meta = extracted
                .meta
                .into_iter()
                .map(|(name, content)| (format!("meta.{name}"), content));
            return Ok(doc.with_fields(meta));
        }

        if media.is_text() {
            let text = String::from_utf8_lossy(&record.payload);
            return Ok(doc.with_field("content", non_empty(text.trim().to_string())));
        }

        Ok(doc)
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
