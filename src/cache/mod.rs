//! Geographer query cache
//!
//! Content queries are cached in-process and indexed by cache tag. The
//! revalidation webhook resolves a content change to a set of tags and
//! hands them to a [`CacheInvalidator`], which evicts every query result
//! registered under those tags.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! query_limit = 500
//! tag_namespace = "sanity"
//! ```

mod config;
mod invalidator;
mod keys;
mod lock;
mod registry;
mod store;

use std::sync::Arc;

pub use config::CacheConfig;
pub use invalidator::{CacheInvalidator, InvalidationReport, TagInvalidator};
pub use keys::{CacheTag, QueryKey, TagNamespace, TagSet};
pub use registry::{Epoch, TagRegistry};
pub use store::{CachedQuery, QueryStore};

/// Shared handles onto the query cache.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<QueryStore>,
    pub registry: Arc<TagRegistry>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Arc::new(QueryStore::new(&config)),
            registry: Arc::new(TagRegistry::new()),
            config,
        }
    }

    pub fn namespace(&self) -> TagNamespace {
        TagNamespace::new(self.config.tag_namespace.clone())
    }

    pub fn invalidator(&self) -> TagInvalidator {
        TagInvalidator::new(self.store.clone(), self.registry.clone())
    }
}
