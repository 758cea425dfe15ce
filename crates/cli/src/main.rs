use crate::{
    commands::{Commands, PipelineArgs, SegmentCommand, build_config},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_config::settings::source::SourceSettings;
use engine_core::{connectors::source::file_uri, parser::Parser as _};
use engine_processing::parse::ContentParser;
use engine_runtime::run_pipeline;
use model::records::record::Record;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod segment;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "sluice",
    version = "0.1.0",
    about = "Bounded-concurrency ingestion of crawl segments and files into search indexes"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Index {
            segment_lists,
            segments,
            sink,
            pipeline,
        } => {
            if segment_lists.is_empty() && segments.is_empty() {
                return Err(CliError::InvalidArgs(
                    "index needs --segs or --segment".to_string(),
                ));
            }
            let source = SourceSettings::Segments {
                lists: segment_lists,
                segments,
            };
            let config = build_config(source, &sink, &pipeline)?;
            ingest(config, &pipeline).await
        }
        Commands::Post {
            input,
            sink,
            pipeline,
        } => {
            let config = build_config(input.to_settings()?, &sink, &pipeline)?;
            ingest(config, &pipeline).await
        }
        Commands::Reparse {
            source,
            sink,
            pipeline,
        } => {
            let config = build_config(source.to_settings(), &sink, &pipeline)?;
            ingest(config, &pipeline).await
        }
        Commands::Parse { file } => {
            let json = parse_file(&file)?;
            println!("{json}");
            Ok(ExitCode::Success)
        }
        Commands::Segment { command } => {
            match command {
                SegmentCommand::Pack { input, output } => {
                    segment::pack(&input, &output)?;
                }
                SegmentCommand::Inspect { file } => segment::inspect(&file)?,
            }
            Ok(ExitCode::Success)
        }
    }
}

async fn ingest(
    config: engine_config::settings::PipelineConfig,
    pipeline: &PipelineArgs,
) -> Result<ExitCode, CliError> {
    info!(
        source = %config.source.describe(),
        sink = config.sink.kind(),
        "Starting ingestion"
    );

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let summary = run_pipeline(config, shutdown.cancel_token()).await?;

    info!(
        run_id = %summary.run_id,
        stage = %summary.stage,
        succeeded = summary.counters.succeeded,
        failed = summary.counters.failed,
        timed_out = summary.counters.timed_out,
        written = summary.counters.documents_written,
        lost = summary.counters.documents_lost,
        commit_ok = summary.commit_ok,
        "Run finished"
    );

    if let Some(path) = &pipeline.report {
        output::write_report(&summary, path)?;
    }
    output::deliver_report(&summary).await;

    if summary.interrupted || shutdown.is_shutdown_requested() {
        warn!("Run was interrupted; buffered documents were drained before exit");
        return Ok(ExitCode::Interrupted);
    }
    Ok(ExitCode::Success)
}

/// Parses one local file with the content parser and renders the document as JSON.
fn parse_file(path: &Path) -> Result<String, CliError> {
    let payload = std::fs::read(path)?;
    let record = Record::new(file_uri(path), payload).with_partition(path);
    let doc = ContentParser::new().parse(&record, &CancellationToken::new())?;
    Ok(serde_json::to_string_pretty(&doc)?)
}
