//! Error types shared by the index modules.
//!
//! Nothing in here ever reaches a caller of the public search API: the
//! manager absorbs these and degrades to empty or partial results. They
//! exist so the recovery code can match on a closed set of cases.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classified filesystem failure
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_path_buf()),
            _ => FsError::Other {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// Why a persisted index record could not be used
#[derive(Debug, Error)]
pub enum PersistError {
    /// No record on disk yet. Not corruption; nothing gets deleted.
    #[error("no persisted index at {0}")]
    Missing(PathBuf),

    #[error(transparent)]
    Io(#[from] FsError),

    #[error("corrupt index record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("index version mismatch (expected {expected}, found {found})")]
    VersionMismatch { expected: String, found: String },

    #[error("malformed content index: {0}")]
    MalformedIndex(String),
}

impl PersistError {
    /// Whether the on-disk record should be removed before rebuilding
    pub fn should_discard(&self) -> bool {
        match self {
            PersistError::Missing(_) => false,
            PersistError::Io(e) => !e.is_not_found(),
            PersistError::Corrupt(_)
            | PersistError::VersionMismatch { .. }
            | PersistError::MalformedIndex(_) => true,
        }
    }
}
