//! Process-wide cache of per-vault indexes
//!
//! Bounded by entry count (least recently used goes first) and by age: an
//! entry older than the TTL is replaced with a fresh, unbuilt index on its
//! next lookup. Expiry and eviction only happen inside
//! [`IndexCache::get_or_create_index`].

use crate::index::manager::SearchIndex;
use crate::index::types::SearchConfig;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_MAX_VAULTS: usize = 10;
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Capacity and lifetime of cached indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_vaults: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_vaults: DEFAULT_MAX_VAULTS,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Snapshot of one cached index
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStats {
    pub collection_id: String,
    pub age_ms: u64,
    pub last_access_ms: u64,
    pub is_index_built: bool,
}

/// Snapshot of the whole cache, most recently used entry first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_vaults: usize,
    pub ttl_ms: u64,
    pub entries: Vec<CacheEntryStats>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct CacheEntry {
    index: Arc<SearchIndex>,
    created_at: Instant,
    last_access: Instant,
}

struct CacheInner {
    config: CacheConfig,
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// LRU/TTL cache of [`SearchIndex`] handles keyed by collection id
pub struct IndexCache {
    inner: Mutex<CacheInner>,
    search_config: SearchConfig,
}

fn capacity(max_vaults: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_vaults).unwrap_or(NonZeroUsize::MIN)
}

impl IndexCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_search_config(config, SearchConfig::default())
    }

    /// Cache whose newly created indexes use `search_config`
    pub fn with_search_config(config: CacheConfig, search_config: SearchConfig) -> Self {
        let config = CacheConfig {
            max_vaults: config.max_vaults.max(1),
            ..config
        };
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity(config.max_vaults)),
                config,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            search_config,
        }
    }

    /// Change capacity and TTL. Shrinking drops least recently used entries.
    pub fn configure(&self, config: CacheConfig) {
        let mut inner = self.lock();
        let max_vaults = config.max_vaults.max(1);

        let before = inner.entries.len();
        inner.entries.resize(capacity(max_vaults));
        let dropped = before - inner.entries.len();
        if dropped > 0 {
            debug!("cache resize evicted {} indexes", dropped);
            inner.evictions += dropped as u64;
        }

        inner.config = CacheConfig { max_vaults, ..config };
    }

    pub fn config(&self) -> CacheConfig {
        self.lock().config
    }

    /// Cached index for `collection_id`, or a new unbuilt one for `root`.
    ///
    /// A live entry counts as used and moves to the front. An entry older
    /// than the TTL is replaced. Inserting past capacity evicts the least
    /// recently used entry.
    pub fn get_or_create_index(&self, collection_id: &str, root: &Path) -> Arc<SearchIndex> {
        let now = Instant::now();
        let mut inner = self.lock();
        let ttl = inner.config.ttl;

        let expired = inner
            .entries
            .peek(collection_id)
            .is_some_and(|entry| now.duration_since(entry.created_at) >= ttl);
        if expired {
            inner.entries.pop(collection_id);
            inner.expirations += 1;
            debug!("index cache entry {} expired", collection_id);
        }

        if let Some(entry) = inner.entries.get_mut(collection_id) {
            entry.last_access = now;
            let index = Arc::clone(&entry.index);
            inner.hits += 1;
            return index;
        }

        inner.misses += 1;
        let index = Arc::new(SearchIndex::with_config(root, self.search_config.clone()));
        let entry = CacheEntry {
            index: Arc::clone(&index),
            created_at: now,
            last_access: now,
        };
        if let Some((evicted, _)) = inner.entries.push(collection_id.to_string(), entry) {
            inner.evictions += 1;
            debug!("index cache full, evicted {}", evicted);
        }
        debug!(
            "cached new index {} for {} ({} entries)",
            collection_id,
            root.display(),
            inner.entries.len()
        );
        index
    }

    /// Drop one entry. Returns whether it was cached.
    pub fn invalidate_cache(&self, collection_id: &str) -> bool {
        let removed = self.lock().entries.pop(collection_id).is_some();
        if removed {
            debug!("invalidated cached index {}", collection_id);
        }
        removed
    }

    pub fn clear_cache(&self) {
        self.lock().entries.clear();
    }

    pub fn get_cache_size(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.lock();
        let entries = inner
            .entries
            .iter()
            .map(|(id, entry)| CacheEntryStats {
                collection_id: id.clone(),
                age_ms: now.duration_since(entry.created_at).as_millis() as u64,
                last_access_ms: now.duration_since(entry.last_access).as_millis() as u64,
                is_index_built: entry.index.is_index_built(),
            })
            .collect();

        CacheStats {
            size: inner.entries.len(),
            max_vaults: inner.config.max_vaults,
            ttl_ms: inner.config.ttl.as_millis() as u64,
            entries,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache(max_vaults: usize, ttl: Duration) -> IndexCache {
        IndexCache::new(CacheConfig { max_vaults, ttl })
    }

    #[test]
    fn test_hit_returns_same_index() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::default();

        let first = cache.get_or_create_index("v1", dir.path());
        let second = cache.get_or_create_index("v1", dir.path());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get_cache_size(), 1);
        let stats = cache.get_cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_lru_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(2, DEFAULT_TTL);

        cache.get_or_create_index("a", dir.path());
        cache.get_or_create_index("b", dir.path());
        // Touch "a" so "b" becomes least recently used
        cache.get_or_create_index("a", dir.path());
        cache.get_or_create_index("c", dir.path());

        let stats = cache.get_cache_stats();
        let ids: Vec<&str> = stats.entries.iter().map(|e| e.collection_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_ttl_expiry_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(4, Duration::from_millis(20));

        let first = cache.get_or_create_index("v", dir.path());
        thread::sleep(Duration::from_millis(40));
        let second = cache.get_or_create_index("v", dir.path());

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get_cache_size(), 1);
        assert_eq!(cache.get_cache_stats().expirations, 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::default();
        cache.get_or_create_index("a", dir.path());
        cache.get_or_create_index("b", dir.path());

        assert!(cache.invalidate_cache("a"));
        assert!(!cache.invalidate_cache("a"));
        assert_eq!(cache.get_cache_size(), 1);

        cache.clear_cache();
        assert_eq!(cache.get_cache_size(), 0);
    }

    #[test]
    fn test_configure_shrinks() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::default();
        for id in ["a", "b", "c"] {
            cache.get_or_create_index(id, dir.path());
        }

        cache.configure(CacheConfig {
            max_vaults: 1,
            ttl: Duration::from_secs(1),
        });

        let stats = cache.get_cache_stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.entries[0].collection_id, "c");
        assert_eq!(stats.max_vaults, 1);
        assert_eq!(stats.ttl_ms, 1000);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(0, DEFAULT_TTL);
        cache.get_or_create_index("a", dir.path());
        assert_eq!(cache.get_cache_size(), 1);
        assert_eq!(cache.config().max_vaults, 1);
    }
}
