//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints and the caching
//! pass-through to the upstream blog API.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    Json,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::cache::{fingerprint, namespace_of, RequestCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, HealthResponse, InvalidateRequest, InvalidateResponse, StatsResponse,
};
use crate::upstream::UpstreamClient;

/// Application state shared across all handlers.
///
/// The cache is internally synchronized; cloning the state clones handles.
#[derive(Clone)]
pub struct AppState {
    /// Cached upstream responses, keyed by request fingerprint
    pub cache: RequestCache<Value>,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Creates a new AppState from an existing cache and upstream client.
    pub fn new(cache: RequestCache<Value>, upstream: UpstreamClient) -> Self {
        Self { cache, upstream }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails when the configured capacity is zero.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = RequestCache::new(config.max_entries, config.default_ttl())?;
        let upstream = UpstreamClient::new(config.upstream_url.clone());
        Ok(Self::new(cache, upstream))
    }
}

/// Handler for GET /api/*path
///
/// Answers from the cache when fresh; otherwise fetches from upstream, with
/// concurrent identical requests sharing one upstream call.
pub async fn proxy_get_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>> {
    let params: Map<String, Value> = query
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let key = fingerprint("GET", &path, &Value::Object(params));

    let upstream = state.upstream.clone();
    let ttl = state.cache.default_ttl();
    let value = state
        .cache
        .fetch_cached(key, ttl, move || async move {
            upstream.get_json(&path, &query).await
        })
        .await?;

    Ok(Json(value))
}

/// Handler for POST/PUT/PATCH/DELETE /api/*path
///
/// Forwards the write upstream. On success every cached response in the
/// path's namespace is dropped, so the next read sees the change.
pub async fn proxy_write_handler(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let body = (!body.is_empty()).then(|| body.to_vec());

    let (status, payload) = state
        .upstream
        .forward(method.clone(), &path, authorization, body)
        .await
        .map_err(|e| CacheError::Upstream(format!("{e:#}")))?;

    if status.is_success() {
        let namespace = namespace_of(&path);
        if !namespace.is_empty() {
            let removed = state.cache.invalidate(namespace);
            info!(%method, namespace, removed, "write succeeded, namespace invalidated");
        }
    }

    Ok((status, Json(payload)))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate(&req.prefix);
    info!(prefix = %req.prefix, removed, "cache prefix invalidated");

    Ok(Json(InvalidateResponse::new(req.prefix, removed)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear();
    info!(removed, "cache cleared");

    Json(ClearResponse::new(removed))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
