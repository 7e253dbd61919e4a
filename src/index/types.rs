use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a document in the content index
pub type DocId = u32;

/// Extension of the documents that get indexed
pub const DEFAULT_EXTENSION: &str = "md";

/// Directory (relative to the vault root) holding the persisted index
pub const METADATA_DIR: &str = ".vault-search";

/// File name of the persisted index record
pub const INDEX_FILE_NAME: &str = "search-index.json";

/// A document known to the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Path relative to the vault root, `/`-separated
    pub path: String,
    /// Basename
    pub name: String,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: u64,
}

/// Document body handed to the content engine while (re)indexing
#[derive(Debug, Clone)]
pub struct ContentDocument {
    pub id: String,
    pub path: String,
    pub content: String,
}

impl ContentDocument {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: path.clone(),
            path,
            content: content.into(),
        }
    }
}

/// Fuzzy filename match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSearchResult {
    pub path: String,
    pub name: String,
    pub score: f32,
    /// Character positions in `name` that matched the query
    pub match_positions: Vec<usize>,
}

/// Full-text match, verified against the file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearchResult {
    pub path: String,
    pub name: String,
    /// Literal case-insensitive occurrences of the query
    pub match_count: usize,
}

/// A matching line with its surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnippet {
    /// 1-indexed
    pub line_number: usize,
    pub line: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

/// Outcome of an incremental update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl UpdateStats {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Lifecycle of a [`SearchIndex`](crate::index::SearchIndex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    /// Nothing crawled or loaded
    Empty,
    /// A build (or load) is running on some thread
    Building,
    /// Queries can be answered
    Ready,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Empty => "empty",
            BuildState::Building => "building",
            BuildState::Ready => "ready",
        }
    }
}

/// Summary of one index, for introspection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub root: PathBuf,
    pub index_path: PathBuf,
    pub state: BuildState,
    pub file_count: usize,
    pub document_count: usize,
    pub term_count: usize,
    /// Milliseconds since the epoch of the last save or load, if any
    pub last_updated: Option<u64>,
}

/// Configuration for a single vault index
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Extension (without the dot) of indexed documents
    pub extension: String,
    /// Metadata directory under the vault root
    pub metadata_dir: String,
    /// Files read in parallel per batch during a full build
    pub build_batch_size: usize,
    /// Soft deadline for the content verification pass
    pub content_search_budget: Duration,
    /// Allowed edit distance as a fraction of the query term length
    pub fuzzy_looseness: f32,
    pub default_file_limit: usize,
    pub default_content_limit: usize,
    pub max_snippets: usize,
    /// Lines of context on each side of a snippet
    pub snippet_context: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            metadata_dir: METADATA_DIR.to_string(),
            build_batch_size: 50,
            content_search_budget: Duration::from_millis(500),
            fuzzy_looseness: 0.2,
            default_file_limit: 20,
            default_content_limit: 20,
            max_snippets: 10,
            snippet_context: 2,
        }
    }
}

/// Basename of a `/`-separated relative path
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
