//! Fixture vaults for integration tests
#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A vault in a temporary directory, removed on drop
pub struct Vault {
    dir: TempDir,
}

impl Vault {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp vault"),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let vault = Self::new();
        for (path, content) in files {
            vault.write(path, content);
        }
        vault
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write fixture file");
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).expect("remove fixture file");
    }

    /// Push the file's mtime forward without changing its content
    pub fn touch(&self, rel: &str) {
        let file = File::options()
            .write(true)
            .open(self.path(rel))
            .expect("open fixture file");
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .expect("set mtime");
    }
}
