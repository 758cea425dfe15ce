use crate::settings::{
    error::SettingsError, pipeline::PipelineSettings, sink::SinkSettings, source::SourceSettings,
};
use std::{fs, path::Path};
use tracing::info;

pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod validator;

/// Everything a run needs: where records come from, where documents go, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source: SourceSettings,
    pub sink: SinkSettings,
    pub settings: PipelineSettings,
}

impl PipelineConfig {
    pub fn new(source: SourceSettings, sink: SinkSettings, settings: PipelineSettings) -> Self {
        PipelineConfig {
            source,
            sink,
            settings,
        }
    }
}

/// Loads pipeline tunables from a JSON file. Missing keys keep their defaults.
pub fn load_settings(path: impl AsRef<Path>) -> Result<PipelineSettings, SettingsError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let settings = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    info!(config = %path.display(), "Loaded pipeline settings");
    Ok(settings)
}
