//! Blog Cache - request cache and caching pass-through for the blog API
//!
//! Caches API responses with TTL staleness and bounded oldest-first eviction,
//! and coalesces concurrent identical requests into one upstream call.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::RequestCache;
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;
pub use upstream::UpstreamClient;
