pub mod elastic;
pub mod error;
pub mod jsonl;
pub mod mapping;
pub mod solr;

use crate::index::error::IndexError;
use reqwest::{Response, Url};
use std::time::Duration;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, IndexError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(IndexError::Transport)
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, IndexError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| IndexError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a non-success response into [`IndexError::Status`], keeping the body for diagnostics.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status {
        status: status.as_u16(),
        body: truncate(&body, 512),
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
