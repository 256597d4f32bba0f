//! API Module
//!
//! HTTP handlers and routing for the caching pass-through and its admin API.
//!
//! # Endpoints
//! - `GET /api/*path` - Cached read from the upstream blog API
//! - `POST|PUT|PATCH|DELETE /api/*path` - Write pass-through
//! - `POST /cache/invalidate` - Invalidate a key prefix
//! - `DELETE /cache` - Clear the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
