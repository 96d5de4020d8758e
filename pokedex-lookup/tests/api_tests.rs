//! Integration tests for pokedex-lookup API endpoints
//!
//! Drives the router in-process with tower's `oneshot`, backed by tier fakes.

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::{FakeSource, Harness};
use pokedex_common::NewRecord;
use pokedex_lookup::api::TIER_HEADER;
use pokedex_lookup::{build_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create app around the harness fakes
fn setup_app(harness: &Harness, request_timeout: Duration) -> axum::Router {
    let state = AppState::new(Arc::new(harness.pipeline()), request_timeout);
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::new(FakeSource::new());
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "pokedex-lookup");
    assert!(body["version"].is_string());
}

// =============================================================================
// GET /records/:key
// =============================================================================

#[tokio::test]
async fn test_found_record_returned_as_json() {
    let harness = Harness::new(FakeSource::new());
    harness.store.seed(NewRecord::new("pikachu", 40, 60).with_id(1));
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/records/PIKACHU")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[TIER_HEADER], "store");
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        serde_json::json!({"id": 1, "name": "pikachu", "height": 40, "weight": 60})
    );
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let harness = Harness::new(FakeSource::new().with_entry("eevee", 3, 65));
    let app = setup_app(&harness, Duration::from_secs(5));

    let first = app.clone().oneshot(get("/records/eevee")).await.unwrap();
    let second = app.oneshot(get("/records/eevee")).await.unwrap();

    assert_eq!(first.headers()[TIER_HEADER], "source");
    assert_eq!(second.headers()[TIER_HEADER], "cache");
    assert_eq!(harness.source.calls(), 1);
}

#[tokio::test]
async fn test_unknown_record_is_empty_404() {
    let harness = Harness::new(FakeSource::new());
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/records/ditto")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_blank_key_is_bad_request() {
    let harness = Harness::new(FakeSource::new());
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/records/%20%20")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(harness.cache.gets(), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let harness = Harness::new(FakeSource::new().with_entry("mew", 4, 40));
    harness.source.fail_transiently(true);
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/records/mew")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "EXTERNAL_UNAVAILABLE");
    assert!(body["error"]["message"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_store_failure_is_service_unavailable() {
    let harness = Harness::new(FakeSource::new());
    harness.store.set_unavailable(true);
    let app = setup_app(&harness, Duration::from_secs(5));

    let response = app.oneshot(get("/records/mew")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn test_slow_lookup_times_out() {
    let harness = Harness::new(
        FakeSource::new()
            .with_entry("snorlax", 21, 4600)
            .with_delay(Duration::from_secs(5)),
    );
    let app = setup_app(&harness, Duration::from_millis(50));

    let response = app.oneshot(get("/records/snorlax")).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(harness.store.inserts(), 0);
}
