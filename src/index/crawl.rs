//! Vault crawler
//!
//! Enumerates the documents under a vault root. Hidden entries (name starts
//! with `.`) and symbolic links are never visited, which also keeps the
//! metadata directory out of the index. Unreadable directories and files
//! that vanish between listing and stat are skipped without error.

use crate::index::types::IndexedFile;
use crate::utils::{system_time_millis, to_slash_path};
use ignore::{DirEntry, WalkBuilder};
use std::path::Path;
use tracing::debug;

/// Collect every document with `extension` below `root`.
///
/// Output order is unspecified.
pub fn crawl(root: &Path, extension: &str) -> Vec<IndexedFile> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .build();

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!("crawl: skipping unreadable entry: {}", err);
                skipped += 1;
                continue;
            }
        };

        // Symlinks report their own file type when not followed
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file || !has_extension(entry.path(), extension) {
            continue;
        }

        match to_indexed_file(root, &entry) {
            Some(file) => files.push(file),
            None => skipped += 1,
        }
    }

    debug!(
        "crawl: {} documents under {} ({} skipped)",
        files.len(),
        root.display(),
        skipped
    );
    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn to_indexed_file(root: &Path, entry: &DirEntry) -> Option<IndexedFile> {
    let rel = entry.path().strip_prefix(root).ok()?;
    let path = to_slash_path(rel)?;
    let mtime = entry.metadata().ok()?.modified().ok()?;
    let name = entry.file_name().to_string_lossy().into_owned();

    Some(IndexedFile {
        path,
        name,
        mtime: system_time_millis(mtime),
    })
}
