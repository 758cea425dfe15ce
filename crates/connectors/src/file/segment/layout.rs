use crate::file::{error::FileError, locator::PartitionLocator, segment::PART_FILE_NAME};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Reads a segment list file: one segment directory per line.
///
/// Blank lines and `#` comments are skipped. Relative entries are resolved against the
/// directory containing the list file.
pub fn read_segment_list(path: impl AsRef<Path>) -> Result<Vec<PathBuf>, FileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| FileError::from_io(path, err))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut segments = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            warn!(list = %path.display(), line = line_num + 1, "Skipping empty line in segment list");
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let segment = PathBuf::from(line);
        segments.push(if segment.is_relative() {
            base.join(segment)
        } else {
            segment
        });
    }
    Ok(segments)
}

/// Finds every part file (named `data`) below `segment`, in path order.
///
/// A path that is itself a file is treated as a single part. A path that does not exist is
/// also returned as a single part, so that opening it fails and the segment is counted as a
/// source error.
pub fn find_parts(segment: &Path) -> Vec<PathBuf> {
    if segment.is_file() {
        return vec![segment.to_path_buf()];
    }
    if !segment.is_dir() {
        warn!(segment = %segment.display(), "Segment does not exist");
        return vec![segment.to_path_buf()];
    }

    let parts: Vec<PathBuf> = WalkDir::new(segment)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(segment = %segment.display(), error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == PART_FILE_NAME)
        .map(|entry| entry.into_path())
        .collect();

    debug!(segment = %segment.display(), parts = parts.len(), "Resolved segment parts");
    parts
}

/// Lazily expands segments into part locators, one segment at a time.
pub fn resolve_parts(segments: Vec<PathBuf>) -> impl Iterator<Item = PartitionLocator> {
    segments
        .into_iter()
        .flat_map(|segment| find_parts(&segment))
        .map(PartitionLocator::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_nested_data_files_in_order() {
        let dir = tempdir().unwrap();
        let seg = dir.path().join("20151027");
        for part in ["part-00001", "part-00000"] {
            let part_dir = seg.join("content").join(part);
            fs::create_dir_all(&part_dir).unwrap();
            fs::write(part_dir.join("data"), b"x").unwrap();
            fs::write(part_dir.join("index"), b"x").unwrap();
        }

        let parts = find_parts(&seg);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("content/part-00000/data"));
        assert!(parts[1].ends_with("content/part-00001/data"));
    }

    #[test]
    fn missing_segment_is_kept_as_a_part() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(find_parts(&missing), vec![missing]);
    }

    #[test]
    fn list_skips_blank_lines_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("segs.txt");
        fs::write(&list, "seg-a\n\n# old\n/abs/seg-b\n").unwrap();

        let segments = read_segment_list(&list).unwrap();
        assert_eq!(
            segments,
            vec![dir.path().join("seg-a"), PathBuf::from("/abs/seg-b")]
        );
    }

    #[test]
    fn resolve_parts_chains_segments() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(a.join("p0")).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("p0").join("data"), b"").unwrap();
        fs::write(b.join("data"), b"").unwrap();

        let locators: Vec<_> = resolve_parts(vec![a, dir.path().join("missing"), b]).collect();
        assert_eq!(locators.len(), 3);
        assert!(locators[1].path.ends_with("missing"));
        assert!(locators[2].path.ends_with("b/data"));
    }
}
