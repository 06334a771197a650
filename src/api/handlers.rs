//! API Handlers
//!
//! HTTP request handlers of the cache inspector.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::cache::CacheContext;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, ReclaimResponse, StatsQuery, StatsResponse};

/// Application state shared across all inspector handlers.
///
/// The context is cheap to clone; every clone sees the same caches.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Cache context being inspected
    pub context: CacheContext,
    /// Default for `?memory=` when the query omits it
    pub estimate_memory: bool,
}

impl AppState {
    /// Creates a new AppState inspecting the given context.
    pub fn new(context: CacheContext) -> Self {
        Self {
            context,
            estimate_memory: false,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(context: CacheContext, config: &Config) -> Self {
        Self {
            context,
            estimate_memory: config.estimate_memory,
        }
    }
}

/// Handler for GET /stats
///
/// Aggregates statistics of every reachable cache. Building the report
/// takes the cache locks, so it runs on the blocking pool.
pub async fn stats_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let estimate_memory = query.estimate_memory(state.estimate_memory);
    let context = state.context.clone();

    let report = tokio::task::spawn_blocking(move || context.statistics(estimate_memory))
        .await
        .map_err(|e| CacheError::Internal(format!("statistics task failed: {e}")))?;

    Ok(Json(StatsResponse::new(&report, estimate_memory)))
}

/// Handler for POST /reclaim
///
/// Simulates memory pressure: clears every weak-held cached value.
pub async fn reclaim_handler(State(state): State<AppState>) -> Result<Json<ReclaimResponse>> {
    let context = state.context.clone();

    let cleared = tokio::task::spawn_blocking(move || context.reclaim_weak_values())
        .await
        .map_err(|e| CacheError::Internal(format!("reclaim task failed: {e}")))?;

    Ok(Json(ReclaimResponse { cleared }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
