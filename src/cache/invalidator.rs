//! Tag invalidation.
//!
//! Marks tags stale and evicts every cached query registered under them.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};

use super::keys::{CacheTag, TagSet};
use super::registry::TagRegistry;
use super::store::QueryStore;

const METRIC_TAGS_INVALIDATED: &str = "geographer_cache_tags_invalidated_total";

/// Outcome of one invalidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Every tag submitted for invalidation.
    pub tags: Vec<CacheTag>,
    /// Cached query results dropped as a consequence.
    pub evicted_entries: usize,
}

/// Anything that can mark tags stale.
///
/// Implementations must be idempotent: invalidating a tag that is already
/// stale leaves the cache in the same observable state.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, tags: &TagSet) -> InvalidationReport;
}

/// Invalidator backed by the in-process query cache.
pub struct TagInvalidator {
    store: Arc<QueryStore>,
    registry: Arc<TagRegistry>,
}

impl TagInvalidator {
    pub fn new(store: Arc<QueryStore>, registry: Arc<TagRegistry>) -> Self {
        Self { store, registry }
    }
}

impl CacheInvalidator for TagInvalidator {
    fn invalidate(&self, tags: &TagSet) -> InvalidationReport {
        let mut evicted_entries = 0;

        for tag in tags {
            let keys = self.registry.invalidate_tag(tag);
            let evicted = keys.iter().filter(|key| self.store.invalidate(key)).count();
            debug!(tag = %tag, evicted, "Cache tag invalidated");
            evicted_entries += evicted;
        }

        counter!(METRIC_TAGS_INVALIDATED).increment(tags.len() as u64);
        info!(
            tag_count = tags.len(),
            evicted_entries, "Cache invalidation complete"
        );

        InvalidationReport {
            tags: tags.iter().cloned().collect(),
            evicted_entries,
        }
    }
}
