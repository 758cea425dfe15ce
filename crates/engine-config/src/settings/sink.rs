use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where documents go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkSettings {
    Solr {
        /// Core URL, e.g. `http://localhost:8983/solr/collection1`
        url: String,
        /// Optional JSON file overriding the dynamic field mapping rules
        #[serde(default)]
        field_map: Option<PathBuf>,
        /// Type numeric and boolean looking text before mapping field names
        #[serde(default)]
        eval: bool,
    },
    Elastic {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        index: Option<String>,
        /// Properties file with `url`, `username`, `password` and `index`
        #[serde(default)]
        credentials: Option<PathBuf>,
    },
    JsonLines { path: PathBuf },
}

impl SinkSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            SinkSettings::Solr { .. } => "solr",
            SinkSettings::Elastic { .. } => "elastic",
            SinkSettings::JsonLines { .. } => "jsonl",
        }
    }
}
