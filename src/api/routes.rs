//! API Routes
//!
//! Configures the Axum router of the cache inspector.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, reclaim_handler, stats_handler, AppState};

/// Creates the inspector router.
///
/// The router is path-relative so a host service can nest it under any
/// mount point.
///
/// # Endpoints
/// - `GET /stats?memory=bool` - Aggregated cache statistics
/// - `POST /reclaim` - Clear weak-held values
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/reclaim", post(reclaim_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheContext;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    async fn status_of(method: Method, uri: &str) -> StatusCode {
        let app = create_router(AppState::new(CacheContext::new()));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_inspector_routes() {
        assert_eq!(status_of(Method::GET, "/health").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/stats").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/stats?memory=true").await, StatusCode::OK);
        assert_eq!(status_of(Method::POST, "/reclaim").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_rejects_bad_query() {
        assert_eq!(
            status_of(Method::GET, "/stats?memory=maybe").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_reclaim_requires_post() {
        assert_eq!(
            status_of(Method::GET, "/reclaim").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
