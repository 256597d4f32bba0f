//! Integration Tests for API Endpoints
//!
//! Drives the full router against a local stand-in for the upstream blog API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    routing::get,
    Json, Router,
};
use blog_cache::{api::create_router, AppState, RequestCache, UpstreamClient};
use futures::future::join_all;
use serde_json::{json, Value};
use tower::ServiceExt;

// == Fake Upstream ==

#[derive(Clone, Default)]
struct UpstreamHits {
    posts: Arc<AtomicUsize>,
    slow: Arc<AtomicUsize>,
    broken: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

async fn list_posts(
    State(hits): State<UpstreamHits>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let n = hits.posts.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "page": query.get("page").cloned().unwrap_or_else(|| "1".to_string()),
        "served": n,
    }))
}

async fn create_post(
    State(hits): State<UpstreamHits>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if headers.get(header::AUTHORIZATION).is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "missing token"})));
    }
    hits.writes.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, Json(json!({"id": 1, "title": body["title"]})))
}

async fn slow(State(hits): State<UpstreamHits>) -> Json<Value> {
    let n = hits.slow.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(100)).await;
    Json(json!({"served": n}))
}

async fn broken(State(hits): State<UpstreamHits>) -> StatusCode {
    hits.broken.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Starts the fake upstream on an ephemeral port and returns its API base URL.
async fn spawn_upstream() -> (String, UpstreamHits) {
    let hits = UpstreamHits::default();
    let router = Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/slow", get(slow))
        .route("/api/broken", get(broken))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}/api", addr), hits)
}

// == Helper Functions ==

async fn create_test_app() -> (Router, AppState, UpstreamHits) {
    let (base_url, hits) = spawn_upstream().await;
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let cache = RequestCache::new(100, Duration::from_secs(300)).unwrap();
    let state = AppState::new(cache, UpstreamClient::with_client(http, base_url));
    (create_router(state.clone()), state, hits)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Cached Reads ==

#[tokio::test]
async fn test_get_is_cached() {
    let (app, _, hits) = create_test_app().await;

    let first = app.clone().oneshot(get_request("/api/posts?page=2")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_to_json(first.into_body()).await;

    let second = app.oneshot(get_request("/api/posts?page=2")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = body_to_json(second.into_body()).await;

    assert_eq!(first["page"], "2");
    assert_eq!(first, second);
    assert_eq!(hits.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_order_shares_cache_entry() {
    let (app, state, hits) = create_test_app().await;

    let a = app.clone().oneshot(get_request("/api/posts?page=1&status=published")).await.unwrap();
    assert_eq!(a.status(), StatusCode::OK);
    let b = app.oneshot(get_request("/api/posts?status=published&page=1")).await.unwrap();
    assert_eq!(b.status(), StatusCode::OK);

    assert_eq!(hits.posts.load(Ordering::SeqCst), 1);
    assert!(state.cache.contains("posts:GET?page=1&status=published"));
}

#[tokio::test]
async fn test_different_params_fetch_separately() {
    let (app, _, hits) = create_test_app().await;

    app.clone().oneshot(get_request("/api/posts?page=1")).await.unwrap();
    app.oneshot(get_request("/api/posts?page=2")).await.unwrap();

    assert_eq!(hits.posts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_encoded_separators_do_not_share_cache_entry() {
    let (app, state, hits) = create_test_app().await;

    let encoded = app
        .clone()
        .oneshot(get_request("/api/posts?search=rock%26tag%3Drust"))
        .await
        .unwrap();
    assert_eq!(encoded.status(), StatusCode::OK);
    let split = app
        .oneshot(get_request("/api/posts?search=rock&tag=rust"))
        .await
        .unwrap();
    assert_eq!(split.status(), StatusCode::OK);

    assert_eq!(hits.posts.load(Ordering::SeqCst), 2);
    assert_eq!(state.cache.len(), 2);
}

#[tokio::test]
async fn test_concurrent_gets_coalesce() {
    let (app, state, hits) = create_test_app().await;

    let requests = (0..10).map(|_| app.clone().oneshot(get_request("/api/slow")));
    let responses = join_all(requests).await;

    let mut bodies = Vec::new();
    for response in responses {
        let response = response.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(body_to_json(response.into_body()).await);
    }

    assert_eq!(hits.slow.load(Ordering::SeqCst), 1);
    assert!(bodies.iter().all(|b| b == &json!({"served": 1})));
    assert_eq!(state.cache.stats().counters.coalesced, 9);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway_and_not_cached() {
    let (app, state, hits) = create_test_app().await;

    let first = app.clone().oneshot(get_request("/api/broken")).await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(first.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("500"));

    let second = app.oneshot(get_request("/api/broken")).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_GATEWAY);

    assert_eq!(hits.broken.load(Ordering::SeqCst), 2);
    assert!(state.cache.is_empty());
}

// == Writes ==

#[tokio::test]
async fn test_write_invalidates_namespace() {
    let (app, state, hits) = create_test_app().await;

    app.clone().oneshot(get_request("/api/posts?page=1")).await.unwrap();
    state.cache.set("tags:GET", json!(["rust"]), None).unwrap();
    assert_eq!(hits.posts.load(Ordering::SeqCst), 1);

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .header("content-type", "application/json")
                .header("authorization", "Bearer admin-token")
                .body(Body::from(r#"{"title":"Hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_to_json(create.into_body()).await;
    assert_eq!(created["title"], "Hello");
    assert_eq!(hits.writes.load(Ordering::SeqCst), 1);

    // Posts were dropped, other namespaces were not
    assert!(!state.cache.contains("posts:GET?page=1"));
    assert!(state.cache.contains("tags:GET"));

    let after = app.oneshot(get_request("/api/posts?page=1")).await.unwrap();
    let after = body_to_json(after.into_body()).await;
    assert_eq!(after["served"], 2);
}

#[tokio::test]
async fn test_rejected_write_keeps_cache() {
    let (app, state, _) = create_test_app().await;

    app.clone().oneshot(get_request("/api/posts")).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"No token"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.cache.contains("posts:GET"));
}

// == Admin Endpoints ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, _, _) = create_test_app().await;

    app.clone().oneshot(get_request("/api/posts")).await.unwrap();
    app.clone().oneshot(get_request("/api/posts")).await.unwrap();

    let response = app.oneshot(get_request("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["size"], 1);
    assert_eq!(json["max_size"], 100);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["pending"], 0);
    assert_eq!(json["entries"][0]["key"], "posts:GET");
    assert!(json["entries"][0]["age_ms"].is_u64());
    assert_eq!(json["entries"][0]["ttl_ms"], 300_000);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_invalidate_endpoint() {
    let (app, state, _) = create_test_app().await;

    state.cache.set("posts:GET", json!([]), None).unwrap();
    state.cache.set("posts/1:GET", json!({}), None).unwrap();
    state.cache.set("categories:GET", json!([]), None).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prefix":"posts"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["prefix"], "posts");
    assert_eq!(json["removed"], 2);
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn test_invalidate_endpoint_empty_prefix() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prefix":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_clear_endpoint() {
    let (app, state, _) = create_test_app().await;

    state.cache.set("posts:GET", json!([]), None).unwrap();
    state.cache.set("about:GET", json!({}), None).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _) = create_test_app().await;

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
