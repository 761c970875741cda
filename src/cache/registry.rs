//! Bidirectional tag registry.
//!
//! Tracks which cached queries were stored under which tags, and when each
//! tag was last invalidated, so the invalidator can find every entry a tag
//! covers and the fetch layer can refuse to cache results that raced with
//! an invalidation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::keys::{CacheTag, QueryKey, TagSet};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Monotonic counter ordering fetches against invalidations.
pub type Epoch = u64;

pub struct TagRegistry {
    /// Maps tags to all cached queries stored under them
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<QueryKey>>>,
    /// Maps cached queries to the tags they were stored under
    key_to_tags: RwLock<HashMap<QueryKey, TagSet>>,
    /// Epoch at which each tag was last invalidated; one entry per distinct
    /// tag ever invalidated, so it grows with the number of slugs.
    invalidated_at: RwLock<HashMap<CacheTag, Epoch>>,
    epoch: AtomicU64,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
            invalidated_at: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Current epoch; capture before fetching and pass to [`Self::is_stale`].
    pub fn epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Register a cached query under its tags.
    pub fn register(&self, key: QueryKey, tags: TagSet) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key);
        }
        k2t.insert(key, tags);
    }

    /// All cached queries stored under `tag`.
    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<QueryKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Tags a cached query was stored under.
    pub fn tags_for_key(&self, key: &QueryKey) -> TagSet {
        rw_read(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a cached query and drop it from every tag it was under.
    pub fn unregister(&self, key: &QueryKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Mark `tag` stale and return the cached queries it covered.
    ///
    /// The returned keys are unregistered from every tag, since their
    /// entries are about to be dropped from the store.
    pub fn invalidate_tag(&self, tag: &CacheTag) -> HashSet<QueryKey> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        rw_write(&self.invalidated_at, SOURCE, "invalidate_tag.epoch").insert(tag.clone(), epoch);

        let affected = rw_write(&self.tag_to_keys, SOURCE, "invalidate_tag.tag_to_keys")
            .remove(tag)
            .unwrap_or_default();
        for key in &affected {
            self.unregister(key);
        }
        affected
    }

    /// True when any of `tags` was invalidated after `since`.
    pub fn is_stale(&self, tags: &TagSet, since: Epoch) -> bool {
        let invalidated_at = rw_read(&self.invalidated_at, SOURCE, "is_stale");
        tags.iter()
            .filter_map(|tag| invalidated_at.get(tag))
            .any(|epoch| *epoch > since)
    }

    /// Epoch of the last invalidation of `tag`, if it was ever invalidated.
    pub fn last_invalidated(&self, tag: &CacheTag) -> Option<Epoch> {
        rw_read(&self.invalidated_at, SOURCE, "last_invalidated")
            .get(tag)
            .copied()
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}
