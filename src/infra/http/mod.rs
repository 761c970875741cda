//! HTTP surface: the revalidation webhook, cached content reads and a
//! health probe.

mod content;
mod error;
mod middleware;
mod revalidate;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{content::ContentService, revalidate::RevalidationService};

pub use error::ApiError;
pub use middleware::RequestContext;

#[derive(Clone)]
pub struct WebhookState {
    pub revalidation: Arc<RevalidationService>,
}

#[derive(Clone)]
pub struct ContentState {
    pub content: Arc<ContentService>,
}

#[derive(Clone)]
pub struct RouterState {
    pub webhook: WebhookState,
    pub content: ContentState,
}

impl FromRef<RouterState> for WebhookState {
    fn from_ref(state: &RouterState) -> Self {
        state.webhook.clone()
    }
}

impl FromRef<RouterState> for ContentState {
    fn from_ref(state: &RouterState) -> Self {
        state.content.clone()
    }
}

pub fn build_router(state: RouterState) -> Router {
    let content_routes = Router::new()
        .route("/homepage", get(content::homepage))
        .route("/about", get(content::about))
        .route("/site-settings", get(content::site_settings))
        .route("/collections", get(content::collections))
        .route("/collections/{slug}", get(content::collection))
        .route("/projects", get(content::projects))
        .route("/projects/{slug}", get(content::project))
        .route("/releases", get(content::releases))
        .route("/releases/{slug}", get(content::release));

    Router::new()
        .route("/api/revalidate", post(revalidate::revalidate))
        .nest("/api/content", content_routes)
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
