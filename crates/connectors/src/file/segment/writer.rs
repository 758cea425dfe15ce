use crate::file::{
    error::FileError,
    segment::{FORMAT_VERSION, MAGIC, MAX_FIELD_LEN},
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Writes entries in the segment part format.
pub struct SegmentPartWriter<W: Write> {
    inner: BufWriter<W>,
    entries: u64,
}

impl SegmentPartWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| FileError::from_io(path, err))?;
        SegmentPartWriter::new(file)
    }
}

impl<W: Write> SegmentPartWriter<W> {
    pub fn new(inner: W) -> Result<Self, FileError> {
        let mut inner = BufWriter::new(inner);
        inner.write_all(MAGIC)?;
        inner.write_all(&[FORMAT_VERSION])?;
        Ok(SegmentPartWriter { inner, entries: 0 })
    }

    pub fn append(&mut self, key: &str, payload: &[u8]) -> Result<(), FileError> {
        let key_len = field_len(key.len())?;
        let payload_len = field_len(payload.len())?;
        self.inner.write_all(&key_len.to_be_bytes())?;
        self.inner.write_all(key.as_bytes())?;
        self.inner.write_all(&payload_len.to_be_bytes())?;
        self.inner.write_all(payload)?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Flushes buffered entries and returns how many were written.
    pub fn finish(mut self) -> Result<u64, FileError> {
        self.inner.flush()?;
        Ok(self.entries)
    }

    pub fn into_inner(self) -> Result<W, FileError> {
        self.inner
            .into_inner()
            .map_err(|err| FileError::IoError(err.into_error()))
    }
}

fn field_len(len: usize) -> Result<u32, FileError> {
    u32::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_FIELD_LEN)
        .ok_or_else(|| FileError::TooLarge {
            path: String::from("<writer>"),
            len: len as u64,
            max: u64::from(MAX_FIELD_LEN),
        })
}
