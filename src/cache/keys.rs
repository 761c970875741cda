//! Cache tags and query keys.
//!
//! `CacheTag` is the invalidation vocabulary shared by the webhook and the
//! content fetch layer; `QueryKey` identifies one cached query result.

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::domain::types::DocumentType;

/// Opaque key under which rendered content is indexed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicated tags for one notification or one query.
pub type TagSet = BTreeSet<CacheTag>;

/// Builds tags, optionally under a shared namespace such as `sanity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagNamespace(Option<String>);

impl TagNamespace {
    pub fn new(namespace: Option<String>) -> Self {
        Self(namespace.filter(|ns| !ns.trim().is_empty()))
    }

    fn tag(&self, body: impl fmt::Display) -> CacheTag {
        match &self.0 {
            Some(ns) => CacheTag(format!("{ns}:{body}")),
            None => CacheTag(body.to_string()),
        }
    }

    /// `homepage`, `about`, `siteSettings`.
    pub fn singleton(&self, kind: DocumentType) -> CacheTag {
        self.tag(kind)
    }

    /// `<type>:list`, covering index pages and slug listings.
    pub fn list(&self, kind: DocumentType) -> CacheTag {
        self.tag(format_args!("{kind}:list"))
    }

    /// `<type>:<slug>`, covering one detail page.
    pub fn entity(&self, kind: DocumentType, slug: &str) -> CacheTag {
        self.tag(format_args!("{kind}:{slug}"))
    }
}

/// Identity of a cached query: the GROQ text plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey(u64);

impl QueryKey {
    pub fn new(query: &str, params: &Value) -> Self {
        // serde_json maps are ordered, so the rendering is canonical.
        Self(hash_value(&(query, params.to_string())))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Compute a hash for any hashable value.
fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
