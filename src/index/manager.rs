//! Per-vault search index
//!
//! [`SearchIndex`] owns the file list and content engine for one vault root.
//! It builds lazily: the first query loads the persisted record or, failing
//! that, crawls and indexes the vault. Afterwards [`SearchIndex::update_index`]
//! refreshes incrementally by mtime.
//!
//! At most one build runs per index. Callers arriving during a build block on
//! a condition variable until it finishes. Index data sits behind an
//! `RwLock`; refreshes read changed files without holding it and apply the
//! result under a single write lock, so readers never see a half-applied
//! update.

use crate::error::PersistError;
use crate::index::content::ContentEngine;
use crate::index::crawl::crawl;
use crate::index::persist;
use crate::index::types::{
    BuildState, ContentDocument, ContentSearchResult, ContextSnippet, FileSearchResult,
    IndexStats, IndexedFile, SearchConfig, UpdateStats, INDEX_FILE_NAME,
};
use crate::query::{extract_snippets, resolve_within, FuzzyMatcher, PathRejection};
use crate::utils::read_text;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

struct Lifecycle {
    state: BuildState,
    /// An incremental update is running; the index stays queryable meanwhile
    refreshing: bool,
}

struct IndexData {
    files: FxHashMap<String, IndexedFile>,
    engine: ContentEngine,
    last_updated: Option<u64>,
}

impl IndexData {
    fn empty(root: &Path, config: &SearchConfig) -> Self {
        Self {
            files: FxHashMap::default(),
            engine: ContentEngine::new(root, config),
            last_updated: None,
        }
    }

    fn sorted_files(&self) -> Vec<IndexedFile> {
        let mut files: Vec<IndexedFile> = self.files.values().cloned().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

/// Search index for a single vault
pub struct SearchIndex {
    root: PathBuf,
    index_path: PathBuf,
    config: SearchConfig,
    matcher: FuzzyMatcher,
    lifecycle: Mutex<Lifecycle>,
    lifecycle_changed: Condvar,
    data: RwLock<IndexData>,
}

#[derive(Clone, Copy)]
enum Hold {
    Build { previous: BuildState },
    Refresh,
}

/// Marks a build or refresh in progress. Dropping it without
/// [`finish`](Self::finish) restores the previous state, so a panicking build
/// does not leave waiters stuck.
struct LifecycleGuard<'a> {
    index: &'a SearchIndex,
    hold: Hold,
    completed: bool,
}

impl LifecycleGuard<'_> {
    fn finish(mut self) {
        self.completed = true;
    }
}

impl Drop for LifecycleGuard<'_> {
    fn drop(&mut self) {
        let mut lifecycle = self.index.lock_lifecycle();
        match self.hold {
            Hold::Build { previous } => {
                lifecycle.state = if self.completed {
                    BuildState::Ready
                } else {
                    previous
                };
            }
            Hold::Refresh => lifecycle.refreshing = false,
        }
        self.index.lifecycle_changed.notify_all();
    }
}

enum Refresh<'a> {
    Incremental(LifecycleGuard<'a>),
    Full(LifecycleGuard<'a>),
}

impl SearchIndex {
    /// Index for the vault at `root` with default settings
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, SearchConfig::default())
    }

    pub fn with_config(root: impl AsRef<Path>, config: SearchConfig) -> Self {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let index_path = root.join(&config.metadata_dir).join(INDEX_FILE_NAME);

        Self {
            data: RwLock::new(IndexData::empty(&root, &config)),
            root,
            index_path,
            config,
            matcher: FuzzyMatcher::default(),
            lifecycle: Mutex::new(Lifecycle {
                state: BuildState::Empty,
                refreshing: false,
            }),
            lifecycle_changed: Condvar::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Location of the persisted record
    pub fn get_index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn state(&self) -> BuildState {
        self.lock_lifecycle().state
    }

    pub fn is_index_built(&self) -> bool {
        self.state() == BuildState::Ready
    }

    /// Make the index queryable: load the persisted record, or build from
    /// scratch and save. Returns at once when already built; waits when
    /// another thread is building.
    pub fn ensure_index_built(&self) {
        let Some(guard) = self.begin_build(false) else {
            return;
        };

        match self.load_persisted() {
            Some(data) => {
                info!(
                    "loaded index for {} ({} files)",
                    self.root.display(),
                    data.files.len()
                );
                *self.write_data() = data;
            }
            None => self.build_and_save(),
        }
        guard.finish();
    }

    /// Discard the current index and build from scratch, ignoring any
    /// persisted record.
    pub fn rebuild_index(&self) {
        if let Some(guard) = self.begin_build(true) {
            self.build_and_save();
            guard.finish();
        }
    }

    /// Bring the index in line with the vault on disk.
    ///
    /// New files are indexed, files whose mtime changed are re-indexed and
    /// vanished files are dropped. The result is persisted. An index that
    /// was never built gets a full build instead, reported as all added.
    pub fn update_index(&self) -> UpdateStats {
        let guard = match self.begin_refresh() {
            Refresh::Full(guard) => {
                self.build_and_save();
                let added = self.read_data().files.len();
                guard.finish();
                return UpdateStats {
                    added,
                    ..UpdateStats::default()
                };
            }
            Refresh::Incremental(guard) => guard,
        };

        let started = Instant::now();
        let current = crawl(&self.root, &self.config.extension);

        let (changed, vanished) = {
            let data = self.read_data();
            let changed: Vec<IndexedFile> = current
                .iter()
                .filter(|file| {
                    data.files
                        .get(&file.path)
                        .is_none_or(|known| known.mtime != file.mtime)
                })
                .cloned()
                .collect();
            let present: FxHashSet<&str> = current.iter().map(|f| f.path.as_str()).collect();
            let vanished: Vec<String> = data
                .files
                .keys()
                .filter(|path| !present.contains(path.as_str()))
                .cloned()
                .collect();
            (changed, vanished)
        };

        // Read outside the lock; queries keep running against the old data
        let documents = self.read_documents(&changed);

        let mut stats = UpdateStats::default();
        {
            let mut data = self.write_data();
            let data = &mut *data;

            for (file, document) in changed.into_iter().zip(documents) {
                let known = data.files.contains_key(&file.path);
                match document {
                    Some(document) => {
                        data.engine.add(&document);
                        if known {
                            stats.updated += 1;
                        } else {
                            stats.added += 1;
                        }
                        data.files.insert(file.path.clone(), file);
                    }
                    // Gone between crawl and read
                    None if known => {
                        data.engine.discard(&file.path);
                        data.files.remove(&file.path);
                        stats.removed += 1;
                    }
                    None => {}
                }
            }

            for path in vanished {
                data.engine.discard(&path);
                data.files.remove(&path);
                stats.removed += 1;
            }

            self.save_locked(data);
        }

        info!(
            "updated index for {}: {} added, {} updated, {} removed in {:.2?}",
            self.root.display(),
            stats.added,
            stats.updated,
            stats.removed,
            started.elapsed()
        );
        guard.finish();
        stats
    }

    /// Fuzzy match file names. `limit` defaults to the configured file limit.
    pub fn search_files(&self, query: &str, limit: Option<usize>) -> Vec<FileSearchResult> {
        self.ensure_index_built();
        let limit = limit.unwrap_or(self.config.default_file_limit);
        let data = self.read_data();
        self.matcher.match_files(query, data.files.values(), limit)
    }

    /// Full-text search, verified against the files on disk
    pub fn search_content(&self, query: &str, limit: Option<usize>) -> Vec<ContentSearchResult> {
        self.ensure_index_built();
        let limit = limit.unwrap_or(self.config.default_content_limit);
        self.read_data().engine.search(query, limit)
    }

    /// Matching lines of one file, with context. Paths resolving outside
    /// the vault and missing files yield nothing.
    pub fn get_snippets(&self, path: &str, query: &str) -> Vec<ContextSnippet> {
        self.ensure_index_built();

        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let full_path = match resolve_within(&self.root, path) {
            Ok(full_path) => full_path,
            Err(PathRejection::OutsideRoot) => {
                warn!(
                    "snippet request for {:?} resolves outside {}",
                    path,
                    self.root.display()
                );
                return Vec::new();
            }
            Err(PathRejection::NotFound) => {
                debug!("snippet request for missing file {:?}", path);
                return Vec::new();
            }
        };

        match read_text(&full_path) {
            Ok(content) => extract_snippets(
                &content,
                query,
                self.config.max_snippets,
                self.config.snippet_context,
            ),
            Err(err) => {
                debug!("snippets: {}", err);
                Vec::new()
            }
        }
    }

    /// Persist the current index. Returns false if the index was never
    /// built or loaded, or if writing failed.
    pub fn save_index(&self) -> bool {
        if !self.is_index_built() {
            debug!("not saving unbuilt index for {}", self.root.display());
            return false;
        }
        let mut data = self.write_data();
        self.save_locked(&mut data)
    }

    /// Replace the in-memory index with the persisted record. A corrupt or
    /// outdated record is deleted and false is returned.
    pub fn load_index(&self) -> bool {
        let Some(guard) = self.begin_build(true) else {
            return false;
        };
        match self.load_persisted() {
            Some(data) => {
                *self.write_data() = data;
                guard.finish();
                true
            }
            None => false,
        }
    }

    /// Indexed files, sorted by path
    pub fn get_file_list(&self) -> Vec<IndexedFile> {
        self.read_data().sorted_files()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state();
        let data = self.read_data();
        IndexStats {
            root: self.root.clone(),
            index_path: self.index_path.clone(),
            state,
            file_count: data.files.len(),
            document_count: data.engine.index().len(),
            term_count: data.engine.index().term_count(),
            last_updated: data.last_updated,
        }
    }

    fn build_and_save(&self) {
        let mut data = self.full_build();
        self.save_locked(&mut data);
        *self.write_data() = data;
    }

    /// Crawl and index everything. Files are read in parallel, one batch at
    /// a time, and added to the engine in order.
    fn full_build(&self) -> IndexData {
        let started = Instant::now();
        let crawled = crawl(&self.root, &self.config.extension);
        let mut data = IndexData::empty(&self.root, &self.config);

        for batch in crawled.chunks(self.config.build_batch_size.max(1)) {
            let documents = self.read_batch(batch);
            for (file, document) in batch.iter().zip(documents) {
                if let Some(document) = document {
                    data.engine.add(&document);
                    data.files.insert(file.path.clone(), file.clone());
                }
            }
        }

        info!(
            "indexed {} files under {} in {:.2?}",
            data.files.len(),
            self.root.display(),
            started.elapsed()
        );
        data
    }

    fn read_documents(&self, files: &[IndexedFile]) -> Vec<Option<ContentDocument>> {
        files
            .chunks(self.config.build_batch_size.max(1))
            .flat_map(|batch| self.read_batch(batch))
            .collect()
    }

    fn read_batch(&self, batch: &[IndexedFile]) -> Vec<Option<ContentDocument>> {
        batch
            .par_iter()
            .map(|file| match read_text(&self.root.join(&file.path)) {
                Ok(content) => Some(ContentDocument::new(file.path.clone(), content)),
                Err(err) => {
                    debug!("skipping unreadable file: {}", err);
                    None
                }
            })
            .collect()
    }

    fn save_locked(&self, data: &mut IndexData) -> bool {
        match persist::write_record(&self.index_path, &data.sorted_files(), data.engine.index()) {
            Ok(last_updated) => {
                data.last_updated = Some(last_updated);
                true
            }
            Err(err) => {
                warn!("failed to save index to {}: {}", self.index_path.display(), err);
                false
            }
        }
    }

    fn load_persisted(&self) -> Option<IndexData> {
        let loaded = match persist::read_record(&self.index_path) {
            Ok(loaded) => loaded,
            Err(PersistError::Missing(_)) => {
                debug!("no persisted index at {}", self.index_path.display());
                return None;
            }
            Err(err) => {
                if err.should_discard() {
                    warn!("discarding persisted index {}: {}", self.index_path.display(), err);
                    persist::discard_record(&self.index_path);
                } else {
                    warn!("could not read persisted index {}: {}", self.index_path.display(), err);
                }
                return None;
            }
        };

        let files: FxHashMap<String, IndexedFile> = loaded
            .files
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect();

        let mut content = loaded.content;
        let orphans: Vec<String> = content
            .paths()
            .filter(|path| !files.contains_key(*path))
            .map(str::to_string)
            .collect();
        for path in &orphans {
            content.discard(path);
        }
        if !orphans.is_empty() {
            debug!("dropped {} documents without a file entry", orphans.len());
        }

        Some(IndexData {
            files,
            engine: ContentEngine::with_index(&self.root, &self.config, content),
            last_updated: Some(loaded.last_updated),
        })
    }

    /// Claim the build slot. `None` when the index is already built and
    /// `force` is false.
    fn begin_build(&self, force: bool) -> Option<LifecycleGuard<'_>> {
        let mut lifecycle = self.lock_lifecycle();
        loop {
            if lifecycle.state == BuildState::Ready && !force {
                return None;
            }
            if lifecycle.state != BuildState::Building && !lifecycle.refreshing {
                break;
            }
            lifecycle = self.wait(lifecycle);
        }

        let previous = lifecycle.state;
        lifecycle.state = BuildState::Building;
        Some(LifecycleGuard {
            index: self,
            hold: Hold::Build { previous },
            completed: false,
        })
    }

    fn begin_refresh(&self) -> Refresh<'_> {
        let mut lifecycle = self.lock_lifecycle();
        while lifecycle.state == BuildState::Building || lifecycle.refreshing {
            lifecycle = self.wait(lifecycle);
        }

        if lifecycle.state == BuildState::Ready {
            lifecycle.refreshing = true;
            Refresh::Incremental(LifecycleGuard {
                index: self,
                hold: Hold::Refresh,
                completed: false,
            })
        } else {
            let previous = lifecycle.state;
            lifecycle.state = BuildState::Building;
            Refresh::Full(LifecycleGuard {
                index: self,
                hold: Hold::Build { previous },
                completed: false,
            })
        }
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Lifecycle>) -> MutexGuard<'a, Lifecycle> {
        self.lifecycle_changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_data(&self) -> RwLockReadGuard<'_, IndexData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, IndexData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("root", &self.root)
            .field("state", &self.state())
            .finish()
    }
}
