use axum::body::Body;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::io::{ReaderStream, SyncIoBridge};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::models::file::SharedFile;
use crate::services::file_storage::FileStorage;

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Maps share files to archive entries, renaming duplicates to `name (n).ext`
/// since entry names must be unique.
pub fn archive_entries(storage: &FileStorage, files: &[SharedFile]) -> Vec<ArchiveEntry> {
    let mut taken = HashSet::new();

    files
        .iter()
        .map(|file| {
            let name = unique_entry_name(&file.original_name, &mut taken);
            ArchiveEntry {
                name,
                path: storage.path_of(&file.stored_name),
            }
        })
        .collect()
}

fn unique_entry_name(original: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(original.to_string()) {
        return original.to_string();
    }

    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original);
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = format!("{} ({}){}", stem, n, extension);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Streams a ZIP of `entries` as a response body. The archive is written on
/// a blocking thread into a bounded pipe, so it is never held in memory
/// whole. Entries whose bytes are missing are skipped.
pub fn stream_archive(entries: Vec<ArchiveEntry>) -> Body {
    let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
    let bridge = SyncIoBridge::new(writer);

    tokio::task::spawn_blocking(move || match write_archive(bridge, &entries) {
        Ok(written) => tracing::debug!("Archive streamed: {} entries", written),
        Err(e) => tracing::error!("Archive error: {}", e),
    });

    Body::from_stream(ReaderStream::new(reader))
}

/// Writes a complete archive to `out` and returns the number of entries.
pub fn write_archive<W: Write>(out: W, entries: &[ArchiveEntry]) -> zip::result::ZipResult<usize> {
    let mut zip = ZipWriter::new_stream(out);
    let mut written = 0;

    for entry in entries {
        let mut source = match std::fs::File::open(&entry.path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    "Skipping archive entry {} ({:?}): {}",
                    entry.name,
                    entry.path,
                    e
                );
                continue;
            }
        };
        let size = source.metadata().map(|m| m.len()).unwrap_or(0);

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .large_file(size >= u32::MAX as u64);

        zip.start_file(entry.name.as_str(), options)?;
        std::io::copy(&mut source, &mut zip)?;
        written += 1;
    }

    let mut out = zip.finish()?;
    out.flush()?;
    Ok(written)
}
