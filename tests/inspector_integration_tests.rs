//! Integration Tests for the Cache Inspector
//!
//! Tests full request/response cycle for each inspector endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use memo_cache::{
    api::create_router, cache::CacheOwner, AppState, CacheContext, CacheSettings,
    CachedOperation, CallArgs,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

struct TestApp {
    router: Router,
    _owners: Vec<CacheOwner>,
}

/// Inspector over a context with one instance-scoped and one shared op.
fn create_test_app() -> TestApp {
    let context = CacheContext::new();
    let render = CachedOperation::new("ReportService::render", CacheSettings::default());
    let rate = CachedOperation::new(
        "ReportService::rate",
        CacheSettings::builder()
            .globally_shared(true)
            .weak_values(true)
            .build()
            .unwrap(),
    );

    let owners: Vec<CacheOwner> = (0..2).map(|_| context.owner("ReportService")).collect();
    for owner in &owners {
        for id in 0..3_u32 {
            owner.call(&render, &CallArgs::new().arg(&id), || id * 10);
        }
        owner.call(&rate, &CallArgs::new().arg("EUR"), || 1.1_f64);
    }

    TestApp {
        router: create_router(AppState::new(context)),
        _owners: owners,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(app.router, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_groups_by_owner_kind() {
    let app = create_test_app();

    let (status, json) = send(app.router, "GET", "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["estimate_memory"], false);

    let rows = json["groups"]["ReportService"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let render = &rows[0];
    assert_eq!(render["operation"], "ReportService::render");
    assert_eq!(render["instance_count"], 2);
    assert_eq!(render["miss_count"], 6);
    assert_eq!(render["entries"], 6);
    assert!(render.get("estimated_memory_bytes").is_none());
}

#[tokio::test]
async fn test_stats_reports_singleton_once() {
    let app = create_test_app();

    let (_, json) = send(app.router, "GET", "/stats").await;

    let rows = json["groups"]["_singleton"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let rate = &rows[0];
    assert_eq!(rate["operation"], "ReportService::rate");
    assert_eq!(rate["instance_count"], 1);
    assert_eq!(rate["hit_count"], 1);
    assert_eq!(rate["miss_count"], 1);
    assert_eq!(rate["hit_rate"], 0.5);
    assert_eq!(rate["settings"]["globally_shared"], true);
}

#[tokio::test]
async fn test_stats_with_memory_estimate() {
    let app = create_test_app();

    let (status, json) = send(app.router, "GET", "/stats?memory=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["estimate_memory"], true);
    let render = &json["groups"]["ReportService"][0];
    assert!(render["estimated_memory_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_stats_empty_context() {
    let router = create_router(AppState::new(CacheContext::new()));

    let (status, json) = send(router, "GET", "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["groups"].as_object().unwrap().is_empty());
}

// == Reclaim Endpoint Tests ==

#[tokio::test]
async fn test_reclaim_clears_weak_values() {
    let app = create_test_app();

    let (status, json) = send(app.router.clone(), "POST", "/reclaim").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleared"], 1);

    // Reclaimed entries count as expired, not as evictions
    let (_, json) = send(app.router.clone(), "POST", "/reclaim").await;
    assert_eq!(json["cleared"], 0);

    let (_, json) = send(app.router, "GET", "/stats").await;
    assert_eq!(json["groups"]["_singleton"][0]["eviction_count"], 0);
}

// == Error Handling Tests ==

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
