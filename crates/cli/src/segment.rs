use crate::error::CliError;
use connectors::file::{
    segment::{reader::SegmentPartReader, writer::SegmentPartWriter},
    tree,
};
use engine_core::connectors::source::file_uri;
use std::path::Path;
use tracing::{info, warn};

/// Packs every regular file below `input` into one segment part at `output`.
///
/// Keys are the `file://` URIs of the packed files. Returns the number of entries.
pub fn pack(input: &Path, output: &Path) -> Result<u64, CliError> {
    let mut writer = SegmentPartWriter::create(output)?;
    for locator in tree::walk(input) {
        let payload = match std::fs::read(locator.path()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(path = %locator.path().display(), error = %err, "Skipping unreadable file");
                continue;
            }
        };
        writer.append(&file_uri(locator.path()), &payload)?;
    }
    let entries = writer.finish()?;
    info!(input = %input.display(), output = %output.display(), entries, "Packed segment part");
    Ok(entries)
}

/// Reads every key of a segment part. Fails on the first corrupt entry.
pub fn keys(path: &Path) -> Result<Vec<String>, CliError> {
    let mut reader = SegmentPartReader::open(path)?;
    let mut keys = Vec::new();
    while let Some((key, _payload)) = reader.next_entry()? {
        keys.push(key);
    }
    Ok(keys)
}

pub fn inspect(path: &Path) -> Result<(), CliError> {
    let keys = keys(path)?;
    println!("{} record(s) in {}", keys.len(), path.display());
    for key in keys {
        println!("{key}");
    }
    Ok(())
}
