//! LRU storage for query results.

use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;
use serde_json::Value;

use super::config::CacheConfig;
use super::keys::{QueryKey, TagSet};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "geographer_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "geographer_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "geographer_cache_evict_total";

/// One cached query result.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub value: Value,
    pub tags: TagSet,
}

impl CachedQuery {
    pub fn new(value: Value, tags: TagSet) -> Self {
        Self { value, tags }
    }
}

/// Query result cache with LRU eviction.
pub struct QueryStore {
    entries: RwLock<LruCache<QueryKey, CachedQuery>>,
}

impl QueryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.query_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedQuery> {
        let hit = rw_write(&self.entries, SOURCE, "get").get(key).cloned();
        match hit {
            Some(_) => counter!(METRIC_CACHE_HIT).increment(1),
            None => counter!(METRIC_CACHE_MISS).increment(1),
        }
        hit
    }

    /// Store a result, returning the key evicted to make room, if any.
    pub fn set(&self, key: QueryKey, entry: CachedQuery) -> Option<QueryKey> {
        let evicted = rw_write(&self.entries, SOURCE, "set")
            .push(key, entry)
            .and_then(|(evicted_key, _)| (evicted_key != key).then_some(evicted_key));
        if evicted.is_some() {
            counter!(METRIC_CACHE_EVICT).increment(1);
        }
        evicted
    }

    /// Remove an entry; returns true when something was removed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        rw_write(&self.entries, SOURCE, "invalidate")
            .pop(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
