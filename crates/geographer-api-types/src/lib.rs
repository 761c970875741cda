//! Wire types for the Geographer HTTP surface.
//!
//! Shared between the server and any tooling that talks to it, so the JSON
//! shapes live in one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by `POST /api/revalidate` for every outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidationResponse {
    pub revalidated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl RevalidationResponse {
    pub fn success(tags: Vec<String>) -> Self {
        Self {
            revalidated: true,
            message: None,
            tags: Some(tags),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            revalidated: false,
            message: Some(message.into()),
            tags: None,
        }
    }
}

/// Body returned by the cached content read routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    /// Cache tags the result is registered under.
    pub tags: Vec<String>,
    /// Whether the result was served from the query cache.
    pub cached: bool,
    pub data: Value,
}
