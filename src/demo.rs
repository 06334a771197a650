//! Demo host service
//!
//! A small report service whose expensive operations are cached, so the
//! inspector has something to show.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use memo_cache::{
    CacheContext, CacheError, CacheOwner, CacheSettings, CachedOperation, CallArgs, Config,
    EvictionStrategy, OpLock,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report not found: {0}")]
    NotFound(u32),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match self {
            ReportError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": self.to_string() })),
            )
                .into_response(),
            ReportError::Cache(e) => e.into_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: u32,
    pub title: String,
    pub rendered_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rate {
    pub currency: String,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct Invalidated {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexRebuilt {
    pub documents: usize,
}

struct Operations {
    render: CachedOperation,
    exchange_rate: CachedOperation,
    rebuild_index: CachedOperation,
}

impl Operations {
    fn new() -> memo_cache::Result<Self> {
        Ok(Self {
            render: CachedOperation::new(
                "ReportService::render",
                CacheSettings::builder()
                    .time_to_live(Duration::from_secs(30))
                    .max_entries(100)
                    .build()?,
            ),
            exchange_rate: CachedOperation::new(
                "ReportService::exchange_rate",
                CacheSettings::builder()
                    .max_entries(16)
                    .eviction(EvictionStrategy::LfuTimecost)
                    .globally_shared(true)
                    .build()?,
            ),
            rebuild_index: CachedOperation::with_defaults("ReportService::rebuild_index")?,
        })
    }
}

/// Report service; each instance owns its private caches.
#[derive(Clone)]
pub struct ReportService {
    owner: CacheOwner,
    ops: Arc<Operations>,
    lock: Arc<OpLock>,
}

impl ReportService {
    pub fn new(context: &CacheContext, config: &Config) -> memo_cache::Result<Self> {
        Ok(Self {
            owner: context.owner("ReportService"),
            ops: Arc::new(Operations::new()?),
            lock: Arc::new(OpLock::new(config.oplock_timeout())),
        })
    }

    pub fn render(&self, id: u32, verbose: bool) -> Result<Report, ReportError> {
        let args = CallArgs::new().arg(&id).arg(&verbose);
        self.owner.invoke(&self.ops.render, &args, || {
            debug!(id, "Rendering report");
            if id == 0 {
                return Err(ReportError::NotFound(id));
            }
            thread::sleep(Duration::from_millis(50));
            Ok(Report {
                id,
                title: if verbose {
                    format!("Report #{id} (full)")
                } else {
                    format!("Report #{id}")
                },
                rendered_at: chrono::Utc::now().to_rfc3339(),
            })
        })
    }

    pub fn exchange_rate(&self, currency: &str, request_id: u64) -> Rate {
        let args = CallArgs::new().arg(currency).ignore(&request_id);
        self.owner.call(&self.ops.exchange_rate, &args, || {
            debug!(currency, request_id, "Fetching exchange rate");
            thread::sleep(Duration::from_millis(20));
            let rate = 1.0 + currency.bytes().map(f64::from).sum::<f64>() / 1000.0;
            Rate {
                currency: currency.to_string(),
                rate,
            }
        })
    }

    pub fn invalidate_report(&self, id: u32, verbose: bool) -> bool {
        self.owner
            .invalidate(&self.ops.render, &CallArgs::new().arg(&id).arg(&verbose))
    }

    /// Rebuilds the search index; concurrent rebuilds wait for each other.
    pub fn rebuild_index(&self) -> Result<usize, ReportError> {
        let documents = self
            .lock
            .call(self.ops.rebuild_index.id(), &CallArgs::new(), || {
                thread::sleep(Duration::from_millis(200));
                self.owner.invalidate_all(&self.ops.render);
                42
            })?;
        Ok(documents)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ReportError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ReportError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReportError::Cache(CacheError::Internal(e.to_string())))?
}

async fn report_handler(
    State(service): State<ReportService>,
    Path(id): Path<u32>,
) -> Result<Json<Report>, ReportError> {
    blocking(move || service.render(id, false)).await.map(Json)
}

async fn rate_handler(
    State(service): State<ReportService>,
    Path(currency): Path<String>,
) -> Result<Json<Rate>, ReportError> {
    let request_id = request_nonce();
    blocking(move || Ok(service.exchange_rate(&currency, request_id)))
        .await
        .map(Json)
}

async fn invalidate_handler(
    State(service): State<ReportService>,
    Path(id): Path<u32>,
) -> Json<Invalidated> {
    Json(Invalidated {
        removed: service.invalidate_report(id, false),
    })
}

async fn rebuild_handler(
    State(service): State<ReportService>,
) -> Result<Json<IndexRebuilt>, ReportError> {
    blocking(move || service.rebuild_index())
        .await
        .map(|documents| Json(IndexRebuilt { documents }))
}

fn request_nonce() -> u64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
}

/// Routes of the demo service.
pub fn router(service: ReportService) -> Router {
    Router::new()
        .route("/reports/:id", get(report_handler))
        .route("/reports/:id/invalidate", post(invalidate_handler))
        .route("/rates/:currency", get(rate_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(context: &CacheContext) -> ReportService {
        ReportService::new(context, &Config::default()).unwrap()
    }

    #[test]
    fn test_render_cached_per_service() {
        let context = CacheContext::new();
        let a = service(&context);
        let b = service(&context);

        let first = a.render(7, false).unwrap();
        assert_eq!(a.render(7, false).unwrap().rendered_at, first.rendered_at);
        assert_eq!(b.render(7, false).unwrap().id, 7);

        let report = context.statistics(false);
        let stats = report.get("ReportService", "ReportService::render").unwrap();
        assert_eq!(stats.instance_count, 2);
        assert_eq!(stats.combined.hit_count, 1);
        assert_eq!(stats.combined.miss_count, 2);
    }

    #[test]
    fn test_missing_report_not_cached() {
        let context = CacheContext::new();
        let svc = service(&context);

        assert!(matches!(svc.render(0, false), Err(ReportError::NotFound(0))));
        assert!(svc.render(0, false).is_err());
        assert!(!svc.invalidate_report(0, false));
    }

    #[test]
    fn test_exchange_rate_shared_and_ignores_request_id() {
        let context = CacheContext::new();
        let a = service(&context);
        let b = service(&context);

        a.exchange_rate("EUR", 1);
        b.exchange_rate("EUR", 2);

        let report = context.statistics(false);
        let stats = report
            .get(memo_cache::cache::SINGLETON_GROUP, "ReportService::exchange_rate")
            .unwrap();
        assert_eq!(stats.combined.hit_count, 1);
        assert_eq!(stats.combined.entries, 1);
    }

    #[test]
    fn test_rebuild_index_clears_rendered_reports() {
        let context = CacheContext::new();
        let svc = service(&context);
        svc.render(3, true).unwrap();

        assert_eq!(svc.rebuild_index().unwrap(), 42);
        assert!(!svc.invalidate_report(3, true));
    }
}
