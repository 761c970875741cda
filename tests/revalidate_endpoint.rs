use std::collections::HashMap;
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
use geographer_api_types::{ContentResponse, RevalidationResponse};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "s3cret";

/// Answers reference lookups per referencing type and every other query
/// with a fixed document.
#[derive(Default)]
struct ScriptedStore {
    references: HashMap<&'static str, Value>,
    fail_references: bool,
    reference_calls: AtomicUsize,
    content_calls: AtomicUsize,
}

impl ScriptedStore {
    fn with_references(collections: Value, projects: Value) -> Self {
        Self {
            references: HashMap::from([("collection", collections), ("project", projects)]),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail_references: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentStore for ScriptedStore {
    async fn query(
        &self,
        _groq: &str,
        params: &QueryParams,
        mode: FetchMode,
    ) -> Result<Value, RepoError> {
        if params.contains_key("documentId") {
            self.reference_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(mode, FetchMode::Fresh, "reference lookups must bypass the CDN");
            if self.fail_references {
                return Err(RepoError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let kind = params.get("type").and_then(Value::as_str).unwrap_or("");
            return Ok(self.references.get(kind).cloned().unwrap_or(json!([])));
        }

        self.content_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "title": "Geographer" }))
    }
}

fn app(store: Arc<ScriptedStore>, secret: Option<&str>) -> Router {
    let cache = CacheState::new(CacheConfig::default());
    let store: Arc<dyn ContentStore> = store;
    let resolver = TagResolver::new(store.clone(), cache.namespace());
    let revalidation = RevalidationService::new(
        WebhookAuthenticator::new(secret.map(str::to_string)),
        resolver,
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

fn webhook(uri: &str, authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build webhook request")
}

fn signed(body: &str) -> Request<Body> {
    webhook(
        "/api/revalidate",
        Some(&format!("Bearer {SECRET}")),
        body,
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, RevalidationResponse) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).expect("revalidation response body");
    (status, body)
}

async fn read_content(app: &Router, uri: &str) -> ContentResponse {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build content request");
    let response = app.clone().oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("content response body")
}

fn tags(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|value| value.to_string()).collect())
}

#[tokio::test]
async fn missing_secret_configuration_fails_before_parsing() {
    let app = app(Arc::new(ScriptedStore::default()), None);

    let (status, body) = send(&app, signed("not json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.revalidated);
    assert_eq!(
        body.message.as_deref(),
        Some("Missing SANITY_REVALIDATE_SECRET environment variable")
    );
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));

    let (status, body) = send(
        &app,
        webhook("/api/revalidate", Some("Bearer nope"), "not json"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message.as_deref(), Some("Invalid revalidation secret"));

    let (status, _) = send(&app, webhook("/api/revalidate", None, "{}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn secret_is_accepted_from_header_or_query() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));
    let payload = r#"{"_type":"about"}"#;

    let (status, body) = send(
        &app,
        webhook("/api/revalidate", Some(&format!("bearer  {SECRET} ")), payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.tags, tags(&["about"]));

    let (status, body) = send(
        &app,
        webhook(&format!("/api/revalidate?secret={SECRET}"), None, payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.revalidated);
}

#[tokio::test]
async fn malformed_payloads_are_bad_requests() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));

    let (status, body) = send(&app, signed("{ nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.message.as_deref(), Some("Invalid JSON payload"));

    let (status, body) = send(&app, signed(r#"{"slug":{"current":"x"}}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.message.as_deref(),
        Some("Unable to determine document type from payload")
    );
}

#[tokio::test]
async fn unhandled_types_are_accepted_without_invalidating() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));

    let (status, body) = send(&app, signed(r#"{"_type":"pressItem"}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!body.revalidated);
    assert_eq!(
        body.message.as_deref(),
        Some("Unhandled Sanity type \"pressItem\".")
    );
    assert!(body.tags.is_none());
}

#[tokio::test]
async fn collection_change_revalidates_list_and_detail() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));

    let (status, body) = send(
        &app,
        signed(r#"{"_type":"collection","slug":{"current":"x"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.revalidated);
    assert_eq!(body.tags, tags(&["collection:list", "collection:x"]));
}

#[tokio::test]
async fn singleton_payload_shapes_resolve_to_their_tag() {
    let app = app(Arc::new(ScriptedStore::default()), Some(SECRET));

    let (_, body) = send(&app, signed(r#"{"_type":"siteSettings"}"#)).await;
    assert_eq!(body.tags, tags(&["siteSettings"]));

    let (_, body) = send(&app, signed(r#"{"document":{"_type":"homepage"}}"#)).await;
    assert_eq!(body.tags, tags(&["homepage"]));

    // Deletions only carry the previous revision.
    let (status, body) = send(&app, signed(r#"{"previous":{"_type":"about"}}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.tags, tags(&["about"]));
}

#[tokio::test]
async fn release_change_fans_out_to_referencing_pages() {
    let store = Arc::new(ScriptedStore::with_references(
        json!([{ "slug": "c1" }, { "slug": null }]),
        json!([{ "slug": "p1" }]),
    ));
    let app = app(store.clone(), Some(SECRET));

    let (status, body) = send(
        &app,
        signed(r#"{"_type":"release","_id":"release-1","slug":{"current":"r"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.tags,
        tags(&[
            "collection:c1",
            "collection:list",
            "project:list",
            "project:p1",
            "release:list",
            "release:r",
        ])
    );
    assert_eq!(store.reference_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreferenced_release_adds_no_page_tags() {
    let store = Arc::new(ScriptedStore::with_references(json!([]), json!(null)));
    let app = app(store, Some(SECRET));

    let (status, body) = send(
        &app,
        signed(r#"{"_type":"release","documentId":"release-1","slug":"r"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.tags, tags(&["release:list", "release:r"]));
}

#[tokio::test]
async fn failed_reference_lookup_invalidates_nothing() {
    let store = Arc::new(ScriptedStore::failing());
    let app = app(store.clone(), Some(SECRET));

    let first = read_content(&app, "/api/content/releases").await;
    assert!(!first.cached);

    let (status, body) = send(
        &app,
        signed(r#"{"_type":"release","_id":"release-1","slug":{"current":"r"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.revalidated);
    assert_eq!(
        body.message.as_deref(),
        Some("Failed to query content store")
    );

    let second = read_content(&app, "/api/content/releases").await;
    assert!(second.cached);
    assert_eq!(store.content_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn health_probe_returns_no_content() {
    let app = app(Arc::new(ScriptedStore::default()), None);
    let request = Request::builder()
        .uri("/_health")
        .body(Body::empty())
        .expect("build health request");
    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
