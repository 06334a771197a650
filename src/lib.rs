//! Memo Cache - transparent per-call result caching
//!
//! Caches the results of expensive operations keyed by their arguments,
//! with TTL expiry, bounded capacity and pluggable eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod oplock;

pub use api::{create_router, AppState};
pub use cache::{
    CacheContext, CacheOwner, CacheSettings, CachedOperation, CallArgs, EvictionStrategy,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use oplock::OpLock;
