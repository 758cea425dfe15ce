use crate::{
    error::SetupError,
    execution::{factory, orchestrator::Orchestrator},
};
use engine_config::{
    report::summary::RunSummary,
    settings::{PipelineConfig, validator::SettingsValidator},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Validates `config`, builds the source, sink and parser, and runs the pipeline
/// to completion.
///
/// Only setup problems are returned as errors. Everything that goes wrong once records
/// flow is counted in the returned summary.
pub async fn run_pipeline(
    config: PipelineConfig,
    cancel: CancellationToken,
) -> Result<RunSummary, SetupError> {
    SettingsValidator::new(&config).validate()?;

    let source = factory::create_source(&config.source, &config.settings)?;
    let sink = factory::create_sink(&config.sink, &config.settings)?;
    let parser = factory::create_parser(&config.source);

    let orchestrator = Orchestrator::new(config.settings, sink, parser);
    info!(run_id = %orchestrator.run_id(), "Starting ingestion run");

    Ok(orchestrator.run(source, cancel).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::settings::{
        error::SettingsError, pipeline::PipelineSettings, sink::SinkSettings,
        source::SourceSettings,
    };
    use engine_core::progress::ProgressStage;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn indexes_a_directory_into_jsonl() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("pages");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.html"), "<html><title>A</title><body>alpha</body></html>").unwrap();
        fs::write(input.join("b.txt"), "beta").unwrap();
        fs::write(input.join("empty.txt"), "").unwrap();
        let out = dir.path().join("docs.jsonl");

        let config = PipelineConfig::new(
            SourceSettings::Directory { root: input },
            SinkSettings::JsonLines { path: out.clone() },
            PipelineSettings::default().with_workers(2).with_commit_threshold(1),
        );
        let summary = run_pipeline(config, CancellationToken::new()).await.unwrap();

        assert_eq!(summary.stage, ProgressStage::Done);
        assert_eq!(summary.counters.records_seen, 3);
        assert_eq!(summary.counters.succeeded, 2);
        assert_eq!(summary.counters.skipped, 1);
        assert_eq!(summary.counters.documents_written, 2);
        assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn invalid_settings_fail_before_running() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::new(
            SourceSettings::Directory {
                root: dir.path().to_path_buf(),
            },
            SinkSettings::JsonLines {
                path: dir.path().join("out.jsonl"),
            },
            PipelineSettings::default().with_workers(0),
        );

        let err = run_pipeline(config, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            SetupError::Settings(SettingsError::ValidationFailed(_))
        ));
        assert!(!dir.path().join("out.jsonl").exists());
    }
}
