use crate::file::{
    error::FileError,
    segment::{FORMAT_VERSION, HEADER_LEN, MAGIC, MAX_FIELD_LEN},
};
use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

/// Sequential reader over one segment part.
///
/// After the first error the reader is finished: callers abandon the rest of the part.
#[derive(Debug)]
pub struct SegmentPartReader<R = BufReader<File>> {
    path: PathBuf,
    inner: R,
    offset: u64,
    entries_read: u64,
    finished: bool,
}

impl SegmentPartReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| FileError::from_io(path, err))?;
        SegmentPartReader::from_reader(path, BufReader::new(file))
    }
}

impl<R: Read> SegmentPartReader<R> {
    /// Wraps an already opened stream and validates its header.
    pub fn from_reader(path: impl Into<PathBuf>, inner: R) -> Result<Self, FileError> {
        let mut reader = SegmentPartReader {
            path: path.into(),
            inner,
            offset: 0,
            entries_read: 0,
            finished: false,
        };

        let mut header = [0u8; HEADER_LEN as usize];
        let filled = reader.fill(&mut header)?;
        if filled < header.len() || &header[..4] != MAGIC {
            return Err(FileError::InvalidFormat(format!(
                "{} is not a segment part (bad magic)",
                reader.path.display()
            )));
        }
        if header[4] != FORMAT_VERSION {
            return Err(FileError::InvalidFormat(format!(
                "{}: unsupported segment part version {}",
                reader.path.display(),
                header[4]
            )));
        }
        Ok(reader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Reads the next `(key, payload)` entry, or `None` at the end of the part.
    pub fn next_entry(&mut self) -> Result<Option<(String, Vec<u8>)>, FileError> {
        if self.finished {
            return Ok(None);
        }

        let result = self.read_entry();
        match &result {
            Ok(Some(_)) => self.entries_read += 1,
            Ok(None) | Err(_) => self.finished = true,
        }
        result
    }

    fn read_entry(&mut self) -> Result<Option<(String, Vec<u8>)>, FileError> {
        let entry_start = self.offset;
        let mut len_buf = [0u8; 4];
        match self.fill(&mut len_buf)? {
            0 => return Ok(None),
            4 => {}
            _ => return Err(self.corrupt(entry_start, "truncated key length")),
        }
        let key_len = self.checked_len(u32::from_be_bytes(len_buf))?;
        let key = self.read_exact_vec(key_len, "truncated key")?;
        let key = String::from_utf8(key)
            .map_err(|_| self.corrupt(entry_start, "key is not valid UTF-8"))?;

        if self.fill(&mut len_buf)? != 4 {
            return Err(self.corrupt(entry_start, "truncated payload length"));
        }
        let payload_len = self.checked_len(u32::from_be_bytes(len_buf))?;
        let payload = self.read_exact_vec(payload_len, "truncated payload")?;

        Ok(Some((key, payload)))
    }

    fn checked_len(&self, len: u32) -> Result<usize, FileError> {
        if len > MAX_FIELD_LEN {
            return Err(FileError::TooLarge {
                path: self.path.display().to_string(),
                len: u64::from(len),
                max: u64::from(MAX_FIELD_LEN),
            });
        }
        Ok(len as usize)
    }

    fn read_exact_vec(&mut self, len: usize, reason: &str) -> Result<Vec<u8>, FileError> {
        let start = self.offset;
        let mut buf = vec![0u8; len];
        if self.fill(&mut buf)? != len {
            return Err(self.corrupt(start, reason));
        }
        Ok(buf)
    }

    /// Reads until `buf` is full or the stream ends. Returns the number of bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, FileError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(FileError::IoError(err)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn corrupt(&self, offset: u64, reason: &str) -> FileError {
        FileError::Corrupt {
            path: self.path.display().to_string(),
            offset,
            reason: reason.to_string(),
        }
    }
}
