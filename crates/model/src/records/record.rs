use std::path::{Path, PathBuf};

/// One raw unit read from a partition, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub payload: Vec<u8>,
    /// Partition the record was read from, kept for diagnostics.
    pub partition: Option<PathBuf>,
}

impl Record {
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Record {
            key: key.into(),
            payload: payload.into(),
            partition: None,
        }
    }

    pub fn with_partition(mut self, partition: impl AsRef<Path>) -> Self {
        self.partition = Some(partition.as_ref().to_path_buf());
        self
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn partition_display(&self) -> String {
        self.partition
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}
