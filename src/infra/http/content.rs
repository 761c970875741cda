use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use geographer_api_types::ContentResponse;
use serde::Deserialize;

use crate::application::{content::NamedQuery, repos::FetchMode};

use super::{ContentState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ReadQuery {
    /// Skip the query cache and the CDN.
    fresh: bool,
}

impl ReadQuery {
    fn mode(&self) -> FetchMode {
        if self.fresh {
            FetchMode::Fresh
        } else {
            FetchMode::Cached
        }
    }
}

async fn read(state: &ContentState, query: NamedQuery, options: &ReadQuery) -> Response {
    let fetched = match state.content.fetch(&query, options.mode()).await {
        Ok(fetched) => fetched,
        Err(err) => return ApiError::from(err).into_response(),
    };

    if query.is_by_slug() && fetched.value.is_null() {
        return ApiError::not_found().into_response();
    }

    Json(ContentResponse {
        tags: fetched.tags.into_iter().map(|tag| tag.into_string()).collect(),
        cached: fetched.cached,
        data: fetched.value,
    })
    .into_response()
}

pub(super) async fn homepage(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Homepage, &params).await
}

pub(super) async fn about(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::About, &params).await
}

pub(super) async fn site_settings(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::SiteSettings, &params).await
}

pub(super) async fn collections(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Collections, &params).await
}

pub(super) async fn collection(
    State(state): State<ContentState>,
    Path(slug): Path<String>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Collection { slug }, &params).await
}

pub(super) async fn projects(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Projects, &params).await
}

pub(super) async fn project(
    State(state): State<ContentState>,
    Path(slug): Path<String>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Project { slug }, &params).await
}

pub(super) async fn releases(
    State(state): State<ContentState>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Releases, &params).await
}

pub(super) async fn release(
    State(state): State<ContentState>,
    Path(slug): Path<String>,
    Query(params): Query<ReadQuery>,
) -> Response {
    read(&state, NamedQuery::Release { slug }, &params).await
}
