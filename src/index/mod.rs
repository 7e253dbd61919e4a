//! Per-vault indexing: crawling, the content engine, persistence, the
//! [`SearchIndex`] that ties them together and the [`IndexCache`] that
//! hands out shared indexes.

pub mod cache;
pub mod content;
pub mod crawl;
pub mod manager;
pub mod persist;
pub mod types;

pub use cache::{CacheConfig, CacheEntryStats, CacheStats, IndexCache};
pub use content::{ContentEngine, ContentIndex};
pub use manager::SearchIndex;
pub use types::*;
