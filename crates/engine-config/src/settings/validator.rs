use crate::settings::{
    PipelineConfig, error::SettingsError, pipeline::PipelineSettings, sink::SinkSettings,
    source::SourceSettings,
};
use std::path::Path;
use tracing::{info, warn};

const LARGE_COMMIT_THRESHOLD: usize = 100_000;

/// Checks a run configuration before anything is opened.
///
/// All problems are collected, so a single run reports every bad setting at once.
pub struct SettingsValidator<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_pipeline(&self.config.settings, &mut errors);
        self.validate_source(&self.config.source, &mut errors);
        self.validate_sink(&self.config.sink, &mut errors);

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        let settings = &self.config.settings;
        info!(
            source = %self.config.source.describe(),
            sink = self.config.sink.kind(),
            workers = settings.workers,
            group_size = settings.group_size(),
            commit_threshold = settings.commit_threshold,
            task_timeout_ms = settings.task_timeout_ms,
            "Settings validation completed successfully"
        );
        Ok(())
    }

    fn validate_pipeline(&self, settings: &PipelineSettings, errors: &mut Vec<String>) {
        if settings.workers == 0 {
            errors.push("workers must be at least 1".to_string());
        }

        match settings.group_size {
            Some(0) => errors.push("group_size must be at least 1".to_string()),
            Some(g) if g > settings.workers && settings.workers > 0 => errors.push(format!(
                "group_size ({g}) must not exceed workers ({})",
                settings.workers
            )),
            _ => {}
        }

        if settings.commit_threshold == 0 {
            errors.push("commit_threshold must be at least 1".to_string());
        } else if settings.commit_threshold > LARGE_COMMIT_THRESHOLD {
            warn!(
                "Commit threshold {} is very large, may cause memory issues",
                settings.commit_threshold
            );
        }

        if settings.task_timeout_ms == 0 {
            errors.push("task_timeout_ms must be greater than zero".to_string());
        }
        if settings.max_payload_bytes == 0 {
            errors.push("max_payload_bytes must be greater than zero".to_string());
        }
        if settings.commit_attempts == 0 {
            errors.push("commit_attempts must be at least 1".to_string());
        }
    }

    fn validate_source(&self, source: &SourceSettings, errors: &mut Vec<String>) {
        match source {
            SourceSettings::Segments { lists, segments } => {
                if lists.is_empty() && segments.is_empty() {
                    errors.push("segment source needs at least one segment or list".to_string());
                }
                for list in lists {
                    require_file(list, "segment list", errors);
                }
                // Missing segment directories are counted as source errors at read time.
            }
            SourceSettings::Directory { root } => {
                if !root.is_dir() {
                    errors.push(format!("input directory {} does not exist", root.display()));
                }
            }
            SourceSettings::PathList { list } => require_file(list, "path list", errors),
            SourceSettings::LinkList { list } => require_file(list, "link list", errors),
            SourceSettings::Solr { url, page_size, .. } => {
                if url.trim().is_empty() {
                    errors.push("solr source needs a url".to_string());
                }
                if *page_size == 0 {
                    errors.push("solr source page_size must be at least 1".to_string());
                }
            }
        }
    }

    fn validate_sink(&self, sink: &SinkSettings, errors: &mut Vec<String>) {
        match sink {
            SinkSettings::Solr { url, field_map, .. } => {
                if url.trim().is_empty() {
                    errors.push("solr sink needs a url".to_string());
                }
                if let Some(field_map) = field_map {
                    require_file(field_map, "field map", errors);
                }
            }
            SinkSettings::Elastic {
                url,
                index,
                credentials,
            } => match credentials {
                Some(path) => require_file(path, "credentials file", errors),
                None => {
                    if url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                        errors.push("elastic sink needs a url or a credentials file".to_string());
                    }
                    if index.as_deref().is_none_or(|i| i.trim().is_empty()) {
                        errors
                            .push("elastic sink needs an index or a credentials file".to_string());
                    }
                }
            },
            SinkSettings::JsonLines { path } => {
                if path.as_os_str().is_empty() {
                    errors.push("jsonl sink needs an output path".to_string());
                }
            }
        }
    }
}

fn require_file(path: &Path, what: &str, errors: &mut Vec<String>) {
    if !path.is_file() {
        errors.push(format!("{what} {} does not exist", path.display()));
    }
}
