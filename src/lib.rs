//! # vault-search
//!
//! Per-vault search indexes for directories of Markdown notes.
//!
//! Each vault gets a [`SearchIndex`](index::SearchIndex) offering:
//!
//! - fuzzy file name search with match positions for highlighting,
//! - full-text search with prefix and typo-tolerant terms, verified against
//!   the files on disk,
//! - line snippets with surrounding context.
//!
//! Indexes build lazily on first use, persist to
//! `<vault>/.vault-search/search-index.json` and refresh incrementally by
//! modification time. An [`IndexCache`](index::IndexCache) keeps a bounded
//! number of them alive across requests.
//!
//! ## Modules
//!
//! - [`index`] - crawling, content engine, persistence, manager and cache
//! - [`query`] - fuzzy name matching and snippet extraction
//! - [`output`] - terminal formatting used by `vsearch`
//! - [`utils`] - tokenizer, filesystem helpers, app configuration
//! - [`error`] - error types used internally for recovery
//!
//! ## Quick Start
//!
//! ```no_run
//! use vault_search::index::SearchIndex;
//!
//! let index = SearchIndex::new("/path/to/vault");
//!
//! for hit in index.search_files("meeting", None) {
//!     println!("{} ({:.1})", hit.path, hit.score);
//! }
//! for hit in index.search_content("budget review", Some(10)) {
//!     println!("{}: {} matches", hit.path, hit.match_count);
//! }
//! ```

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;
