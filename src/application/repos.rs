//! Content store traits describing the Sanity adapter.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::types::ReferencingType;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("content store request failed: {0}")]
    Transport(String),
    #[error("content store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content store response could not be decoded: {0}")]
    Decode(String),
    #[error("content store timeout")]
    Timeout,
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// How a query may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Reads that may be served from the content CDN.
    Cached,
    /// Reads that must observe the latest published state.
    Fresh,
}

/// GROQ query parameters, sent as `$name=<json>`.
pub type QueryParams = Map<String, Value>;

/// Read access to the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a GROQ query and return its `result`.
    async fn query(
        &self,
        groq: &str,
        params: &QueryParams,
        mode: FetchMode,
    ) -> Result<Value, RepoError>;
}

const REFERENCING_SLUGS_QUERY: &str =
    r#"*[_type == $type && references($documentId)]{ "slug": slug.current }"#;

/// Slugs of documents of `kind` that reference `document_id`.
///
/// Always bypasses the CDN: the webhook fires right after a publish and the
/// CDN may not have caught up yet.
pub async fn referencing_slugs(
    store: &dyn ContentStore,
    kind: ReferencingType,
    document_id: &str,
) -> Result<Vec<String>, RepoError> {
    let mut params = QueryParams::new();
    params.insert(
        "type".to_string(),
        Value::String(kind.document_type().as_str().to_string()),
    );
    params.insert(
        "documentId".to_string(),
        Value::String(document_id.to_string()),
    );

    let result = store
        .query(REFERENCING_SLUGS_QUERY, &params, FetchMode::Fresh)
        .await?;
    slugs_from_rows(result)
}

/// Extract non-empty `slug` values from `[{ "slug": ... }]` rows.
fn slugs_from_rows(result: Value) -> Result<Vec<String>, RepoError> {
    let rows = match result {
        Value::Array(rows) => rows,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(RepoError::decode(format!(
                "expected an array of rows, got `{other}`"
            )));
        }
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match row.get("slug") {
            Some(Value::String(slug)) if !slug.is_empty() => Some(slug.clone()),
            _ => None,
        })
        .collect())
}
