use crate::error::SourceError;
use connectors::file::{error::FileError, segment::reader::SegmentPartReader};
use model::records::record::Record;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub mod solr;

pub use connectors::file::locator::PartitionLocator;

/// An open partition, read sequentially.
pub trait PartitionReader: Send {
    /// Next record, `Ok(None)` at the end of the partition.
    fn next_record(&mut self) -> Result<Option<Record>, SourceError>;

    fn path(&self) -> &Path;
}

/// Opens partitions of one physical format.
pub trait PartitionOpener: Send {
    fn open(&self, locator: &PartitionLocator) -> Result<Box<dyn PartitionReader>, SourceError>;
}

/// Opens binary segment parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentPartOpener;

struct SegmentPartition {
    reader: SegmentPartReader,
}

impl PartitionOpener for SegmentPartOpener {
    fn open(&self, locator: &PartitionLocator) -> Result<Box<dyn PartitionReader>, SourceError> {
        let reader = SegmentPartReader::open(&locator.path).map_err(|source| SourceError::Open {
            path: locator.path.display().to_string(),
            source,
        })?;
        Ok(Box::new(SegmentPartition { reader }))
    }
}

impl PartitionReader for SegmentPartition {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        match self.reader.next_entry() {
            Ok(Some((key, payload))) => {
                Ok(Some(Record::new(key, payload).with_partition(self.reader.path())))
            }
            Ok(None) => Ok(None),
            Err(source) => Err(SourceError::Read {
                path: self.reader.path().display().to_string(),
                source,
            }),
        }
    }

    fn path(&self) -> &Path {
        self.reader.path()
    }
}

/// Treats every file as a partition holding exactly one record: the whole file.
///
/// The record key is the locator's key when present, otherwise the file's `file://` URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeFileOpener;

struct WholeFilePartition {
    path: PathBuf,
    key: String,
    consumed: bool,
}

impl PartitionOpener for WholeFileOpener {
    fn open(&self, locator: &PartitionLocator) -> Result<Box<dyn PartitionReader>, SourceError> {
        let path = &locator.path;
        let open_err = |source: FileError| SourceError::Open {
            path: path.display().to_string(),
            source,
        };

        let meta = fs::metadata(path).map_err(|err| open_err(FileError::from_io(path, err)))?;
        if !meta.is_file() {
            return Err(open_err(FileError::InvalidFormat(format!(
                "{} is not a regular file",
                path.display()
            ))));
        }

        let key = locator.key.clone().unwrap_or_else(|| file_uri(path));
        Ok(Box::new(WholeFilePartition {
            path: path.clone(),
            key,
            consumed: false,
        }))
    }
}

impl PartitionReader for WholeFilePartition {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;

        let payload = fs::read(&self.path).map_err(|err| SourceError::Read {
            path: self.path.display().to_string(),
            source: FileError::from_io(&self.path, err),
        })?;
        Ok(Some(
            Record::new(self.key.clone(), payload).with_partition(&self.path),
        ))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// `file://` URI of `path`, made absolute against the working directory.
pub fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}
