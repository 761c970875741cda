//! Cached, tag-addressable reads from the content store.
//!
//! Every named query carries the tags of the page it feeds. Results are
//! cached under those tags until the revalidation webhook invalidates one
//! of them.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::error::AppError;
use crate::application::queries;
use crate::application::repos::{ContentStore, FetchMode, QueryParams};
use crate::cache::{CacheState, CachedQuery, Epoch, QueryKey, TagNamespace, TagSet};
use crate::domain::types::DocumentType;

/// A page-level query and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedQuery {
    Homepage,
    About,
    SiteSettings,
    Collections,
    CollectionSlugs,
    Collection { slug: String },
    Projects,
    ProjectSlugs,
    Project { slug: String },
    Releases,
    ReleaseSlugs,
    Release { slug: String },
}

impl NamedQuery {
    pub fn name(&self) -> &'static str {
        match self {
            NamedQuery::Homepage => "homepage",
            NamedQuery::About => "about",
            NamedQuery::SiteSettings => "site_settings",
            NamedQuery::Collections => "collections",
            NamedQuery::CollectionSlugs => "collection_slugs",
            NamedQuery::Collection { .. } => "collection_by_slug",
            NamedQuery::Projects => "projects",
            NamedQuery::ProjectSlugs => "project_slugs",
            NamedQuery::Project { .. } => "project_by_slug",
            NamedQuery::Releases => "releases",
            NamedQuery::ReleaseSlugs => "release_slugs",
            NamedQuery::Release { .. } => "release_by_slug",
        }
    }

    pub fn groq(&self) -> &'static str {
        match self {
            NamedQuery::Homepage => queries::HOMEPAGE,
            NamedQuery::About => queries::ABOUT,
            NamedQuery::SiteSettings => queries::SITE_SETTINGS,
            NamedQuery::Collections => queries::COLLECTIONS,
            NamedQuery::CollectionSlugs => queries::COLLECTION_SLUGS,
            NamedQuery::Collection { .. } => queries::COLLECTION_BY_SLUG,
            NamedQuery::Projects => queries::PROJECTS,
            NamedQuery::ProjectSlugs => queries::PROJECT_SLUGS,
            NamedQuery::Project { .. } => queries::PROJECT_BY_SLUG,
            NamedQuery::Releases => queries::RELEASES,
            NamedQuery::ReleaseSlugs => queries::RELEASE_SLUGS,
            NamedQuery::Release { .. } => queries::RELEASE_BY_SLUG,
        }
    }

    pub fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(slug) = self.slug() {
            params.insert("slug".to_string(), Value::String(slug.to_string()));
        }
        params
    }

    pub fn slug(&self) -> Option<&str> {
        match self {
            NamedQuery::Collection { slug }
            | NamedQuery::Project { slug }
            | NamedQuery::Release { slug } => Some(slug),
            _ => None,
        }
    }

    /// Document type whose changes affect this query.
    pub fn document_type(&self) -> DocumentType {
        match self {
            NamedQuery::Homepage => DocumentType::Homepage,
            NamedQuery::About => DocumentType::About,
            NamedQuery::SiteSettings => DocumentType::SiteSettings,
            NamedQuery::Collections
            | NamedQuery::CollectionSlugs
            | NamedQuery::Collection { .. } => DocumentType::Collection,
            NamedQuery::Projects | NamedQuery::ProjectSlugs | NamedQuery::Project { .. } => {
                DocumentType::Project
            }
            NamedQuery::Releases | NamedQuery::ReleaseSlugs | NamedQuery::Release { .. } => {
                DocumentType::Release
            }
        }
    }

    /// Tags the rendered page is registered under.
    ///
    /// Detail pages depend on their own tag and the list tag; listings and
    /// slug enumerations only on the list tag.
    pub fn tags(&self, namespace: &TagNamespace) -> TagSet {
        let kind = self.document_type();
        let mut tags = TagSet::new();
        if kind.is_singleton() {
            tags.insert(namespace.singleton(kind));
            return tags;
        }
        tags.insert(namespace.list(kind));
        if let Some(slug) = self.slug() {
            tags.insert(namespace.entity(kind, slug));
        }
        tags
    }

    pub fn is_by_slug(&self) -> bool {
        self.slug().is_some()
    }
}

/// Result of one content read.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub value: Value,
    pub tags: TagSet,
    pub cached: bool,
}

/// Reads named queries through the query cache.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    cache: CacheState,
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>, cache: CacheState) -> Self {
        Self { store, cache }
    }

    /// Run `query`, serving it from the cache when allowed.
    ///
    /// `FetchMode::Fresh` bypasses the cache in both directions. A result
    /// whose tags were invalidated while the fetch was in flight is
    /// returned but not kept.
    pub async fn fetch(&self, query: &NamedQuery, mode: FetchMode) -> Result<Fetched, AppError> {
        let tags = query.tags(&self.cache.namespace());
        let params = query.params();
        let use_cache = self.cache.config.enabled && mode == FetchMode::Cached;
        let key = QueryKey::new(query.groq(), &Value::Object(params.clone()));

        let hit = use_cache.then(|| self.cache.store.get(&key)).flatten();
        if let Some(hit) = hit {
            debug!(
                target = "geographer::content",
                query = query.name(),
                "Serving query from cache"
            );
            return Ok(Fetched {
                value: hit.value,
                tags: hit.tags,
                cached: true,
            });
        }

        let epoch = self.cache.registry.epoch();
        let started = Instant::now();
        let value = self.store.query(query.groq(), &params, mode).await?;
        debug!(
            target = "geographer::content",
            query = query.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched query from content store"
        );

        if use_cache {
            self.remember(key, &value, &tags, epoch);
        }

        Ok(Fetched {
            value,
            tags,
            cached: false,
        })
    }

    fn remember(&self, key: QueryKey, value: &Value, tags: &TagSet, epoch: Epoch) {
        let store = &self.cache.store;
        let registry = &self.cache.registry;

        if let Some(evicted) = store.set(key, CachedQuery::new(value.clone(), tags.clone())) {
            registry.unregister(&evicted);
        }
        registry.register(key, tags.clone());

        // An invalidation may have landed between the fetch and the insert.
        if registry.is_stale(tags, epoch) {
            warn!(
                target = "geographer::content",
                "Discarding query result invalidated while in flight"
            );
            store.invalidate(&key);
            registry.unregister(&key);
        }
    }
}
