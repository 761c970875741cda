//! Cache configuration.
//!
//! Controls the tag-addressable query cache via `geographer.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_QUERY_LIMIT: usize = 500;

/// Cache configuration from `geographer.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache query results between webhook invalidations.
    pub enabled: bool,
    /// Maximum cached query results before LRU eviction.
    pub query_limit: usize,
    /// Optional namespace prepended to every tag (`<namespace>:<tag>`).
    pub tag_namespace: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query_limit: DEFAULT_QUERY_LIMIT,
            tag_namespace: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            query_limit: settings.query_limit.get(),
            tag_namespace: settings.tag_namespace.clone(),
        }
    }
}

impl CacheConfig {
    /// Returns the query limit as NonZeroUsize, clamping to 1 if zero.
    pub fn query_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.query_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
