use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where records come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    /// Segment directories, given directly and/or through list files (one segment per line).
    Segments {
        #[serde(default)]
        lists: Vec<PathBuf>,
        #[serde(default)]
        segments: Vec<PathBuf>,
    },
    /// Every regular file below a directory.
    Directory { root: PathBuf },
    /// Files named in a list file, one path per line.
    PathList { list: PathBuf },
    /// Files named in a CSV link list; the URL column becomes the record key.
    LinkList { list: PathBuf },
    /// Stored documents of a Solr core matching `query`, fetched page by page.
    Solr {
        url: String,
        #[serde(default = "default_query")]
        query: String,
        #[serde(default)]
        start: u64,
        #[serde(default = "default_page_size")]
        page_size: usize,
        /// Stored fields to fetch. Empty fetches all of them.
        #[serde(default)]
        fields: Vec<String>,
    },
}

fn default_query() -> String {
    "*:*".to_string()
}

fn default_page_size() -> usize {
    1000
}

impl SourceSettings {
    pub fn describe(&self) -> String {
        match self {
            SourceSettings::Segments { lists, segments } => format!(
                "segments ({} list file(s), {} segment(s))",
                lists.len(),
                segments.len()
            ),
            SourceSettings::Directory { root } => format!("directory {}", root.display()),
            SourceSettings::PathList { list } => format!("path list {}", list.display()),
            SourceSettings::LinkList { list } => format!("link list {}", list.display()),
            SourceSettings::Solr {
                url, query, start, ..
            } => format!("solr {url} query {query:?} from {start}"),
        }
    }
}
