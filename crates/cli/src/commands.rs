use crate::error::CliError;
use clap::{Args, Subcommand, ValueEnum};
use engine_config::settings::{
    PipelineConfig, load_settings, pipeline::PipelineSettings, sink::SinkSettings,
    source::SourceSettings,
};
use std::{path::PathBuf, time::Duration};

#[derive(Subcommand)]
pub enum Commands {
    /// Index crawl segments into a sink
    #[command(name = "index")]
    Index {
        /// File listing one segment directory per line
        #[arg(long = "segs", value_name = "FILE")]
        segment_lists: Vec<PathBuf>,

        /// Segment directory, may be repeated
        #[arg(long = "segment", value_name = "DIR")]
        segments: Vec<PathBuf>,

        #[command(flatten)]
        sink: SinkArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Post local files into a sink
    #[command(name = "post")]
    Post {
        #[command(flatten)]
        input: PostInput,

        #[command(flatten)]
        sink: SinkArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Re-parse documents stored in a Solr core and write them to a sink
    #[command(name = "reparse")]
    Reparse {
        #[command(flatten)]
        source: ReparseArgs,

        #[command(flatten)]
        sink: SinkArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run the content parser on one file and print the document as JSON
    #[command(name = "parse")]
    Parse { file: PathBuf },

    /// Build and inspect segment part files
    #[command(name = "segment")]
    Segment {
        #[command(subcommand)]
        command: SegmentCommand,
    },
}

#[derive(Subcommand)]
pub enum SegmentCommand {
    /// Pack every file below a directory into one segment part
    Pack {
        #[arg(long = "in", value_name = "DIR")]
        input: PathBuf,

        #[arg(long = "out", value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the record count and keys of a segment part
    Inspect { file: PathBuf },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PostInput {
    /// Directory to walk
    #[arg(long = "in", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// File listing one path per line
    #[arg(long = "list", value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// CSV link list; the URL column becomes the document id
    #[arg(long = "csv", value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

impl PostInput {
    pub fn to_settings(&self) -> Result<SourceSettings, CliError> {
        match (&self.dir, &self.list, &self.csv) {
            (Some(root), None, None) => Ok(SourceSettings::Directory { root: root.clone() }),
            (None, Some(list), None) => Ok(SourceSettings::PathList { list: list.clone() }),
            (None, None, Some(list)) => Ok(SourceSettings::LinkList { list: list.clone() }),
            _ => Err(CliError::InvalidArgs(
                "exactly one of --in, --list or --csv is required".to_string(),
            )),
        }
    }
}

#[derive(Args, Debug)]
pub struct ReparseArgs {
    /// Solr core holding the stored documents
    #[arg(long = "src", value_name = "URL")]
    pub src: String,

    /// Query selecting the documents
    #[arg(long = "query", default_value = "*:*")]
    pub query: String,

    /// Offset of the first document
    #[arg(long = "start", default_value_t = 0)]
    pub start: u64,

    /// Documents fetched per request
    #[arg(long = "rows", default_value_t = 1000)]
    pub rows: usize,

    /// Stored field to fetch, may be repeated; all fields when absent
    #[arg(long = "field", value_name = "NAME")]
    pub fields: Vec<String>,
}

impl ReparseArgs {
    pub fn to_settings(&self) -> SourceSettings {
        SourceSettings::Solr {
            url: self.src.clone(),
            query: self.query.clone(),
            start: self.start,
            page_size: self.rows,
            fields: self.fields.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Solr,
    Elastic,
    Jsonl,
}

#[derive(Args, Debug)]
pub struct SinkArgs {
    #[arg(long = "sink", value_enum, default_value_t = SinkKind::Solr)]
    pub kind: SinkKind,

    /// Solr core URL or Elasticsearch base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Elasticsearch index
    #[arg(long)]
    pub index: Option<String>,

    /// Properties file with url, username, password and index
    #[arg(long = "creds", value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Output file of the jsonl sink
    #[arg(long = "out", value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// JSON file overriding the Solr field mapping rules
    #[arg(long = "field-map", value_name = "FILE")]
    pub field_map: Option<PathBuf>,

    /// Type numeric and boolean looking text before mapping Solr field names
    #[arg(long)]
    pub eval: bool,
}

impl SinkArgs {
    pub fn to_settings(&self) -> Result<SinkSettings, CliError> {
        match self.kind {
            SinkKind::Solr => {
                let url = self.url.clone().ok_or_else(|| {
                    CliError::InvalidArgs("--url is required for the solr sink".to_string())
                })?;
                Ok(SinkSettings::Solr {
                    url,
                    field_map: self.field_map.clone(),
                    eval: self.eval,
                })
            }
            SinkKind::Elastic => Ok(SinkSettings::Elastic {
                url: self.url.clone(),
                index: self.index.clone(),
                credentials: self.credentials.clone(),
            }),
            SinkKind::Jsonl => {
                let path = self.out.clone().ok_or_else(|| {
                    CliError::InvalidArgs("--out is required for the jsonl sink".to_string())
                })?;
                Ok(SinkSettings::JsonLines { path })
            }
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Number of parser workers
    #[arg(long = "threads")]
    pub threads: Option<usize>,

    /// Records submitted together, defaults to --threads
    #[arg(long = "group-size")]
    pub group_size: Option<usize>,

    /// Buffered documents that trigger a flush
    #[arg(long = "batch")]
    pub batch: Option<usize>,

    /// Per-record parse timeout in milliseconds
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Sleep after a failed bulk write, in milliseconds
    #[arg(long = "backoff-ms")]
    pub backoff_ms: Option<u64>,

    /// JSON file with pipeline settings; flags override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the run summary here as JSON
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// JSON-lines file for records and documents that did not reach the sink
    #[arg(long = "failed-log", value_name = "FILE")]
    pub failed_log: Option<PathBuf>,
}

impl PipelineArgs {
    pub fn to_settings(&self) -> Result<PipelineSettings, CliError> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => PipelineSettings::default(),
        };

        if let Some(threads) = self.threads {
            settings = settings.with_workers(threads);
        }
        if let Some(group_size) = self.group_size {
            settings = settings.with_group_size(group_size);
        }
        if let Some(batch) = self.batch {
            settings = settings.with_commit_threshold(batch);
        }
        if let Some(ms) = self.timeout_ms {
            settings = settings.with_task_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.backoff_ms {
            settings = settings.with_sink_backoff(Duration::from_millis(ms));
        }
        if let Some(path) = &self.failed_log {
            settings = settings.with_failed_log(path);
        }
        Ok(settings)
    }
}

pub fn build_config(
    source: SourceSettings,
    sink: &SinkArgs,
    pipeline: &PipelineArgs,
) -> Result<PipelineConfig, CliError> {
    Ok(PipelineConfig::new(
        source,
        sink.to_settings()?,
        pipeline.to_settings()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn jsonl_sink(out: &str) -> SinkArgs {
        SinkArgs {
            kind: SinkKind::Jsonl,
            url: None,
            index: None,
            credentials: None,
            out: Some(PathBuf::from(out)),
            field_map: None,
            eval: false,
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("pipeline.json");
        fs::write(&config, r#"{ "workers": 2, "commit_threshold": 50 }"#).unwrap();

        let args = PipelineArgs {
            threads: Some(8),
            timeout_ms: Some(250),
            config: Some(config),
            ..Default::default()
        };
        let settings = args.to_settings().unwrap();

        assert_eq!(settings.workers, 8);
        assert_eq!(settings.group_size(), 8);
        assert_eq!(settings.commit_threshold, 50);
        assert_eq!(settings.task_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn solr_sink_requires_url() {
        let mut sink = jsonl_sink("out.jsonl");
        sink.kind = SinkKind::Solr;
        sink.out = None;
        assert!(matches!(sink.to_settings(), Err(CliError::InvalidArgs(_))));

        sink.url = Some("http://localhost:8983/solr/crawl".to_string());
        assert!(matches!(
            sink.to_settings().unwrap(),
            SinkSettings::Solr { ref url, .. } if url == "http://localhost:8983/solr/crawl"
        ));
    }

    #[test]
    fn builds_post_config() {
        let input = PostInput {
            dir: None,
            list: Some(PathBuf::from("files.txt")),
            csv: None,
        };
        let config = build_config(
            input.to_settings().unwrap(),
            &jsonl_sink("docs.jsonl"),
            &PipelineArgs::default(),
        )
        .unwrap();

        assert_eq!(
            config.source,
            SourceSettings::PathList {
                list: PathBuf::from("files.txt")
            }
        );
        assert_eq!(config.sink.kind(), "jsonl");
        assert_eq!(config.settings, PipelineSettings::default());
    }
}
