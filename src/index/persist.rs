//! Persisted index record
//!
//! One JSON file per vault:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "lastUpdated": 1718000000000,
//!   "fileList": [{ "path": "notes/a.md", "name": "a.md", "mtime": 1717999999000 }],
//!   "contentIndex": { ... }
//! }
//! ```
//!
//! A record is only trusted when it parses completely, carries exactly
//! [`CURRENT_VERSION`], and its content index restores cleanly. Anything
//! else is reported as an error the caller answers by deleting the file and
//! rebuilding; there is no migration path.

use crate::error::{FsError, PersistError};
use crate::index::content::ContentIndex;
use crate::index::types::IndexedFile;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Format version written to, and required from, the record
pub const CURRENT_VERSION: &str = "1.0.0";

/// On-disk shape of the record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedIndexRecord {
    pub version: String,
    pub last_updated: u64,
    pub file_list: Vec<IndexedFile>,
    /// Serialized [`ContentIndex`], opaque at this level
    pub content_index: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    version: &'a str,
    last_updated: u64,
    file_list: &'a [IndexedFile],
    content_index: &'a ContentIndex,
}

/// A successfully decoded record
#[derive(Debug)]
pub struct LoadedIndex {
    pub last_updated: u64,
    pub files: Vec<IndexedFile>,
    pub content: ContentIndex,
}

/// Write the record, replacing any previous one. Returns the timestamp stored.
pub fn write_record(
    path: &Path,
    files: &[IndexedFile],
    content: &ContentIndex,
) -> Result<u64, PersistError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| FsError::from_io(parent, e))?;

    let last_updated = now_millis();
    let record = RecordRef {
        version: CURRENT_VERSION,
        last_updated,
        file_list: files,
        content_index: content,
    };
    let bytes = serde_json::to_vec(&record)?;

    // Uniquely named temp file + rename: readers never see a partial record
    // and concurrent writers never share a temp file
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| FsError::from_io(parent, e))?;
    temp.write_all(&bytes).map_err(|e| FsError::from_io(path, e))?;
    temp.persist(path).map_err(|e| FsError::from_io(path, e.error))?;

    debug!(
        "wrote index record {} ({} files, {} bytes)",
        path.display(),
        files.len(),
        bytes.len()
    );
    Ok(last_updated)
}

/// Read and fully validate the record at `path`
pub fn read_record(path: &Path) -> Result<LoadedIndex, PersistError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = FsError::from_io(path, e);
            return Err(if err.is_not_found() {
                PersistError::Missing(path.to_path_buf())
            } else {
                err.into()
            });
        }
    };
    decode_record(&bytes)
}

/// Decode a record from raw bytes
pub fn decode_record(bytes: &[u8]) -> Result<LoadedIndex, PersistError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;

    // Check the version before the shape so version skew is reported as such
    if let Some(found) = value.get("version").and_then(|v| v.as_str())
        && found != CURRENT_VERSION
    {
        return Err(PersistError::VersionMismatch {
            expected: CURRENT_VERSION.to_string(),
            found: found.to_string(),
        });
    }

    let record: PersistedIndexRecord = serde_json::from_value(value)?;
    if record.version != CURRENT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: CURRENT_VERSION.to_string(),
            found: record.version,
        });
    }

    let mut seen = HashSet::with_capacity(record.file_list.len());
    for file in &record.file_list {
        if !seen.insert(file.path.as_str()) {
            return Err(PersistError::MalformedIndex(format!(
                "duplicate file entry {}",
                file.path
            )));
        }
    }

    let mut content: ContentIndex = serde_json::from_value(record.content_index)
        .map_err(|e| PersistError::MalformedIndex(e.to_string()))?;
    content.restore().map_err(PersistError::MalformedIndex)?;

    Ok(LoadedIndex {
        last_updated: record.last_updated,
        files: record.file_list,
        content,
    })
}

/// Best-effort removal of a stale record
pub fn discard_record(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed stale index record {}", path.display()),
        Err(e) => debug!("could not remove index record {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::ContentDocument;

    fn sample() -> (Vec<IndexedFile>, ContentIndex) {
        let files = vec![IndexedFile {
            path: "notes/a.md".into(),
            name: "a.md".into(),
            mtime: 42,
        }];
        let mut content = ContentIndex::new();
        content.add(&ContentDocument::new("notes/a.md", "hello persisted world"));
        (files, content)
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".vault-search").join("search-index.json");
        let (files, content) = sample();

        let written_at = write_record(&path, &files, &content).unwrap();
        let loaded = read_record(&path).unwrap();

        assert_eq!(loaded.last_updated, written_at);
        assert_eq!(loaded.files, files);
        assert!(loaded.content.contains("notes/a.md"));

        // No temp file left next to the record
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["search-index.json"]);
    }

    #[test]
    fn test_concurrent_writers_leave_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".vault-search").join("search-index.json");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let (files, content) = sample();
                    for _ in 0..20 {
                        write_record(&path, &files, &content).unwrap();
                    }
                });
            }
        });

        let loaded = read_record(&path).unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_record_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search-index.json");
        let (files, content) = sample();
        write_record(&path, &files, &content).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["version"], CURRENT_VERSION);
        assert!(value["lastUpdated"].is_u64());
        assert!(value["fileList"].is_array());
        assert!(value["contentIndex"].is_object());
    }

    #[test]
    fn test_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_record(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, PersistError::Missing(_)));
        assert!(!err.should_discard());
    }

    #[test]
    fn test_version_mismatch() {
        let json = br#"{"version":"0.0.0","lastUpdated":1,"fileList":[],"contentIndex":{}}"#;
        let err = decode_record(json).unwrap_err();
        assert!(matches!(err, PersistError::VersionMismatch { .. }));
        assert!(err.should_discard());
    }

    #[test]
    fn test_truncated_json() {
        let err = decode_record(br#"{"version":"1.0.0","lastUp"#).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));
    }

    #[test]
    fn test_missing_field() {
        let json = br#"{"version":"1.0.0","lastUpdated":1,"contentIndex":{}}"#;
        assert!(matches!(
            decode_record(json).unwrap_err(),
            PersistError::Corrupt(_)
        ));
    }

    #[test]
    fn test_malformed_content_index() {
        let json = br#"{"version":"1.0.0","lastUpdated":1,"fileList":[],"contentIndex":{"terms":7}}"#;
        assert!(matches!(
            decode_record(json).unwrap_err(),
            PersistError::MalformedIndex(_)
        ));
    }

    #[test]
    fn test_discard_missing_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        discard_record(&dir.path().join("nothing.json"));
    }
}
