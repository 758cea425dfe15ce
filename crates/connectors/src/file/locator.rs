use std::path::{Path, PathBuf};

/// Points at one partition of the input.
///
/// `key` overrides the record key a partition opener would derive from the path,
/// e.g. the original URL of a downloaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLocator {
    pub path: PathBuf,
    pub key: Option<String>,
}

impl PartitionLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PartitionLocator {
            path: path.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for PartitionLocator {
    fn from(path: PathBuf) -> Self {
        PartitionLocator::new(path)
    }
}
