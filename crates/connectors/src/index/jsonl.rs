use crate::{file::error::FileError, index::error::IndexError};
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Appends one JSON object per line to a local file.
#[derive(Debug)]
pub struct JsonLinesWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl JsonLinesWriter {
    /// Opens `path` for appending, creating it and its parent directories if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| FileError::from_io(parent, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| FileError::from_io(path, err))?;

        Ok(JsonLinesWriter {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// Serializes `value` before touching the file, so a failed item never leaves a partial line.
    pub fn append<T: Serialize>(&mut self, value: &T) -> Result<(), IndexError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes buffered lines and syncs the file to disk.
    pub fn sync(&mut self) -> Result<(), IndexError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}
