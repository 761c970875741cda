use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use geographer::application::{
    auth::WebhookAuthenticator,
    content::ContentService,
    repos::{ContentStore, FetchMode, QueryParams, RepoError},
    revalidate::RevalidationService,
    tags::TagResolver,
};
use geographer::cache::{CacheConfig, CacheState};
use geographer::infra::http::{ContentState, RouterState, WebhookState, build_router};
use geographer_api_types::ContentResponse;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "s3cret";

/// Serves a document per slug, `null` for the slug `missing`, and counts
/// how often each fetch mode reached it.
#[derive(Default)]
struct CountingStore {
    cached_reads: AtomicUsize,
    fresh_reads: AtomicUsize,
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn query(
        &self,
        _groq: &str,
        params: &QueryParams,
        mode: FetchMode,
    ) -> Result<Value, RepoError> {
        if params.contains_key("documentId") {
            return Ok(json!([]));
        }
        match mode {
            FetchMode::Cached => self.cached_reads.fetch_add(1, Ordering::SeqCst),
            FetchMode::Fresh => self.fresh_reads.fetch_add(1, Ordering::SeqCst),
        };
        match params.get("slug").and_then(Value::as_str) {
            Some("missing") => Ok(Value::Null),
            Some(slug) => Ok(json!({ "slug": slug })),
            None => Ok(json!([{ "slug": "a" }, { "slug": "b" }])),
        }
    }
}

fn app(store: Arc<CountingStore>, cache: CacheConfig) -> Router {
    let cache = CacheState::new(cache);
    let store: Arc<dyn ContentStore> = store;
    let revalidation = RevalidationService::new(
        WebhookAuthenticator::new(Some(SECRET.to_string())),
        TagResolver::new(store.clone(), cache.namespace()),
        Arc::new(cache.invalidator()),
    );
    let content = ContentService::new(store, cache);

    build_router(RouterState {
        webhook: WebhookState {
            revalidation: Arc::new(revalidation),
        },
        content: ContentState {
            content: Arc::new(content),
        },
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

async fn read(app: &Router, uri: &str) -> ContentResponse {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "unexpected status for {uri}: {body}");
    serde_json::from_value(body).expect("content response")
}

async fn revalidate(app: &Router, payload: Value) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/revalidate")
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .body(Body::from(payload.to_string()))
        .expect("build webhook request");
    app.clone()
        .oneshot(request)
        .await
        .expect("router response")
        .status()
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let store = Arc::new(CountingStore::default());
    let app = app(store.clone(), CacheConfig::default());

    let first = read(&app, "/api/content/projects/a").await;
    assert!(!first.cached);
    assert_eq!(first.data, json!({ "slug": "a" }));
    assert_eq!(first.tags, vec!["project:a", "project:list"]);

    let second = read(&app, "/api/content/projects/a").await;
    assert!(second.cached);
    assert_eq!(second.data, first.data);
    assert_eq!(store.cached_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fresh_reads_bypass_the_cache() {
    let store = Arc::new(CountingStore::default());
    let app = app(store.clone(), CacheConfig::default());

    read(&app, "/api/content/about").await;
    let fresh = read(&app, "/api/content/about?fresh=true").await;
    assert!(!fresh.cached);
    assert_eq!(store.fresh_reads.load(Ordering::SeqCst), 1);

    // The fresh read neither consumed nor replaced the cached entry.
    assert!(read(&app, "/api/content/about").await.cached);
    assert_eq!(store.cached_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_slug_is_not_found() {
    let app = app(Arc::new(CountingStore::default()), CacheConfig::default());

    let (status, body) = get(&app, "/api/content/collections/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn webhook_evicts_only_matching_entries() {
    let store = Arc::new(CountingStore::default());
    let app = app(store.clone(), CacheConfig::default());

    read(&app, "/api/content/collections").await;
    read(&app, "/api/content/collections/x").await;
    read(&app, "/api/content/collections/y").await;
    read(&app, "/api/content/homepage").await;
    assert_eq!(store.cached_reads.load(Ordering::SeqCst), 4);

    let status = revalidate(
        &app,
        json!({ "_type": "collection", "slug": { "current": "x" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!read(&app, "/api/content/collections").await.cached);
    assert!(!read(&app, "/api/content/collections/x").await.cached);
    // `collection:list` covers every detail page too.
    assert!(!read(&app, "/api/content/collections/y").await.cached);
    assert!(read(&app, "/api/content/homepage").await.cached);
}

#[tokio::test]
async fn namespaced_tags_are_reported_and_invalidated() {
    let store = Arc::new(CountingStore::default());
    let app = app(
        store,
        CacheConfig {
            tag_namespace: Some("sanity".to_string()),
            ..Default::default()
        },
    );

    let first = read(&app, "/api/content/site-settings").await;
    assert_eq!(first.tags, vec!["sanity:siteSettings"]);

    assert_eq!(
        revalidate(&app, json!({ "_type": "siteSettings" })).await,
        StatusCode::OK
    );
    assert!(!read(&app, "/api/content/site-settings").await.cached);
}

#[tokio::test]
async fn disabled_cache_always_reaches_the_store() {
    let store = Arc::new(CountingStore::default());
    let app = app(
        store.clone(),
        CacheConfig {
            enabled: false,
            ..Default::default()
        },
    );

    assert!(!read(&app, "/api/content/releases").await.cached);
    assert!(!read(&app, "/api/content/releases").await.cached);
    assert_eq!(store.cached_reads.load(Ordering::SeqCst), 2);
}
