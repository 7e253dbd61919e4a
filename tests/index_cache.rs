//! Index cache behaviour across several vaults

#[path = "fixtures/utils.rs"]
mod fixtures;

use fixtures::Vault;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vault_search::index::{CacheConfig, IndexCache};

#[test]
fn test_capacity_evicts_least_recently_used() {
    let vault = Vault::with_files(&[("a.md", "alpha")]);
    let cache = IndexCache::new(CacheConfig {
        max_vaults: 3,
        ttl: Duration::from_secs(300),
    });

    for id in ["v0", "v1", "v2"] {
        cache.get_or_create_index(id, vault.root());
    }
    // v0 becomes most recent, so v1 is the eviction victim
    cache.get_or_create_index("v0", vault.root());
    cache.get_or_create_index("v3", vault.root());

    let stats = cache.get_cache_stats();
    assert_eq!(stats.size, 3);
    let mut ids: Vec<&str> = stats.entries.iter().map(|e| e.collection_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["v0", "v2", "v3"]);
}

#[test]
fn test_access_refreshes_without_duplicating() {
    let vault = Vault::with_files(&[("a.md", "alpha")]);
    let cache = IndexCache::default();

    let first = cache.get_or_create_index("vault", vault.root());
    thread::sleep(Duration::from_millis(50));
    let second = cache.get_or_create_index("vault", vault.root());

    assert!(Arc::ptr_eq(&first, &second));
    let stats = cache.get_cache_stats();
    assert_eq!(stats.size, 1);
    assert!(stats.entries[0].last_access_ms < 50);
    assert!(stats.entries[0].age_ms >= 50);
}

#[test]
fn test_stats_report_build_state() {
    let vault = Vault::with_files(&[("a.md", "alpha")]);
    let cache = IndexCache::default();

    let index = cache.get_or_create_index("vault", vault.root());
    assert!(!cache.get_cache_stats().entries[0].is_index_built);

    assert_eq!(index.search_files("a", None).len(), 1);
    assert!(cache.get_cache_stats().entries[0].is_index_built);

    let json = serde_json::to_value(cache.get_cache_stats()).unwrap();
    assert_eq!(json["maxVaults"], 10);
    assert_eq!(json["ttlMs"], 300_000);
    assert_eq!(json["entries"][0]["collectionId"], "vault");
}

#[test]
fn test_expired_entry_is_rebuilt_fresh() {
    let vault = Vault::with_files(&[("a.md", "alpha")]);
    let cache = IndexCache::new(CacheConfig {
        max_vaults: 2,
        ttl: Duration::from_millis(30),
    });

    let old = cache.get_or_create_index("vault", vault.root());
    old.ensure_index_built();
    thread::sleep(Duration::from_millis(60));

    let fresh = cache.get_or_create_index("vault", vault.root());
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(!fresh.is_index_built());
    assert_eq!(cache.get_cache_size(), 1);
}

#[test]
fn test_shared_across_threads() {
    let vault = Vault::with_files(&[("a.md", "alpha"), ("b.md", "beta")]);
    let cache = Arc::new(IndexCache::default());
    let root = vault.root().to_path_buf();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let root = root.clone();
            thread::spawn(move || cache.get_or_create_index("shared", &root).search_files("md", None).len())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(cache.get_cache_size(), 1);
}
