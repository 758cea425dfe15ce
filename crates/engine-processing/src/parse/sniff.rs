//! Content type detection from leading bytes, falling back to the key's file extension.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub main: String,
    pub sub: String,
}

impl MediaType {
    pub fn new(main: &str, sub: &str) -> Self {
        MediaType {
            main: main.to_string(),
            sub: sub.to_string(),
        }
    }

    pub fn octet_stream() -> Self {
        MediaType::new("application", "octet-stream")
    }

    pub fn is_html(&self) -> bool {
        self.main == "text" && self.sub == "html"
            || self.main == "application" && self.sub == "xhtml+xml"
    }

    pub fn is_text(&self) -> bool {
        self.main == "text"
            || self.main == "application" && matches!(self.sub.as_str(), "json" | "xml")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)
    }
}

const MAGIC: &[(&[u8], &str, &str)] = &[
    (b"%PDF-", "application", "pdf"),
    (b"\x89PNG\r\n\x1a\n", "image", "png"),
    (b"GIF87a", "image", "gif"),
    (b"GIF89a", "image", "gif"),
    (b"\xff\xd8\xff", "image", "jpeg"),
    (b"PK\x03\x04", "application", "zip"),
    (b"\x1f\x8b", "application", "gzip"),
    (b"{\\rtf", "application", "rtf"),
];

const HTML_MARKERS: &[&str] = &["<!doctype html", "<html", "<head", "<body", "<title"];

const SNIFF_LEN: usize = 1024;

/// Detects the media type of `payload`, using `key` (a URL or path) as a hint.
pub fn sniff(payload: &[u8], key: &str) -> MediaType {
    if let Some((_, main, sub)) = MAGIC.iter().find(|(magic, _, _)| payload.starts_with(magic)) {
        return MediaType::new(main, sub);
    }

    let head = &payload[..payload.len().min(SNIFF_LEN)];
    let head = head.strip_prefix(b"\xef\xbb\xbf").unwrap_or(head);
    // A multi-byte character cut at the sniff boundary still counts as text.
    let looks_textual = !head.contains(&0)
        && match std::str::from_utf8(head) {
            Ok(_) => true,
            Err(err) => err.error_len().is_none(),
        };

    if looks_textual {
        let lower = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
        if HTML_MARKERS.iter().any(|marker| lower.starts_with(marker)) {
            return MediaType::new("text", "html");
        }
        if lower.starts_with("<?xml") {
            return if lower.contains("<html") {
                MediaType::new("application", "xhtml+xml")
            } else {
                MediaType::new("application", "xml")
            };
        }
    }

    if let Some(media) = from_extension(key) {
        return media;
    }

    if looks_textual && !head.is_empty() {
        MediaType::new("text", "plain")
    } else {
        MediaType::octet_stream()
    }
}

fn from_extension(key: &str) -> Option<MediaType> {
    let path = key.split(['?', '#']).next().unwrap_or(key);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;

    let (main, sub) = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" | "shtml" => ("text", "html"),
        "xhtml" => ("application", "xhtml+xml"),
        "txt" | "text" | "log" => ("text", "plain"),
        "csv" => ("text", "csv"),
        "md" => ("text", "markdown"),
        "json" => ("application", "json"),
        "xml" => ("application", "xml"),
        "pdf" => ("application", "pdf"),
        "png" => ("image", "png"),
        "jpg" | "jpeg" => ("image", "jpeg"),
        "gif" => ("image", "gif"),
        _ => return None,
    };
    Some(MediaType::new(main, sub))
}
