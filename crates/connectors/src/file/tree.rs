//! Locator producers for whole-file inputs: directory walks, path lists and CSV link lists.

use crate::file::{error::FileError, locator::PartitionLocator};
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Column holding the original URL in a link list row.
pub const CSV_URL_COLUMN: usize = 1;
/// Column holding the local path of the downloaded file in a link list row.
pub const CSV_PATH_COLUMN: usize = 4;

/// Lazily walks `root`, yielding every regular file. Hidden entries are pruned and
/// unreadable entries are logged and skipped.
pub fn walk(root: &Path) -> impl Iterator<Item = PartitionLocator> + Send + use<> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                Some(PartitionLocator::new(entry.into_path()))
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable entry");
                None
            }
        })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Paths read from a list file, one per line.
pub struct PathList {
    source: PathBuf,
    lines: Lines<BufReader<File>>,
}

pub fn list(path: impl AsRef<Path>) -> Result<PathList, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| FileError::from_io(path, err))?;
    Ok(PathList {
        source: path.to_path_buf(),
        lines: BufReader::new(file).lines(),
    })
}

impl Iterator for PathList {
    type Item = PartitionLocator;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    warn!(list = %self.source.display(), error = %err, "Stopped reading path list");
                    return None;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(PartitionLocator::new(line));
        }
    }
}

/// Rows of a headerless link list: `domain,url,title,<unused>,path`.
///
/// The URL becomes the record key. Rows without a URL or path are skipped and counted.
pub struct CsvLinks {
    source: PathBuf,
    records: csv::StringRecordsIntoIter<File>,
    skipped: usize,
}

pub fn csv_links(path: impl AsRef<Path>) -> Result<CsvLinks, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| FileError::from_io(path, err))?;
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    Ok(CsvLinks {
        source: path.to_path_buf(),
        records: reader.into_records(),
        skipped: 0,
    })
}

impl CsvLinks {
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for CsvLinks {
    type Item = PartitionLocator;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next()? {
                Ok(row) => {
                    let url = row.get(CSV_URL_COLUMN).map(str::trim).unwrap_or_default();
                    let path = row.get(CSV_PATH_COLUMN).map(str::trim).unwrap_or_default();
                    if url.is_empty() || path.is_empty() {
                        self.skipped += 1;
                        warn!(
                            list = %self.source.display(),
                            line = row.position().map(|p| p.line()).unwrap_or_default(),
                            "Skipping link row without url or path"
                        );
                        continue;
                    }
                    return Some(PartitionLocator::new(path).with_key(url));
                }
                Err(err) => {
                    self.skipped += 1;
                    warn!(list = %self.source.display(), error = %err, "Skipping malformed link row");
                    if err.is_io_error() {
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walk_skips_hidden_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("b.html"), b"b").unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), b"h").unwrap();

        let paths: Vec<PathBuf> = walk(dir.path()).map(|l| l.path).collect();
        assert_eq!(
            paths,
            vec![dir.path().join("b.html"), dir.path().join("sub").join("a.txt")]
        );
    }

    #[test]
    fn list_ignores_blank_and_comment_lines() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("files.txt");
        fs::write(&file, "/data/a.html\n\n  # skip\n/data/b.pdf  \n").unwrap();

        let paths: Vec<PathBuf> = list(&file).unwrap().map(|l| l.path).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/data/a.html"), PathBuf::from("/data/b.pdf")]
        );
    }

    #[test]
    fn csv_links_use_url_as_key() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("links.csv");
        fs::write(
            &file,
            "example.onion,http://example.onion/,Home,x,/dump/1.html\n\
             broken,row\n\
             other.onion,http://other.onion/a,\"A, B\",x,/dump/2.html\n",
        )
        .unwrap();

        let mut links = csv_links(&file).unwrap();
        let first = links.next().unwrap();
        assert_eq!(first.key.as_deref(), Some("http://example.onion/"));
        assert_eq!(first.path, PathBuf::from("/dump/1.html"));

        let second = links.next().unwrap();
        assert_eq!(second.key.as_deref(), Some("http://other.onion/a"));
        assert!(links.next().is_none());
        assert_eq!(links.skipped(), 1);
    }
}
