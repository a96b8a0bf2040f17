mod common;

use axum::http::StatusCode;
use compare_core::testing::{FixtureLauncher, StubRetailer};
use compare_core::{ResultCache, Retailer};
use std::sync::Arc;
use std::time::Duration;

use crate::common::TestHarness;

fn retailers() -> Vec<Arc<dyn Retailer>> {
    vec![
        Arc::new(StubRetailer::priced("Amazon.in", 71_290, 0)),
        Arc::new(StubRetailer::priced("Flipkart", 69_999, 599)),
        Arc::new(StubRetailer::failing("Reliance Digital", "net::ERR_TIMED_OUT")),
        Arc::new(StubRetailer::priced("Croma", 70_990, 799)),
        Arc::new(StubRetailer::unavailable("Official Store")),
    ]
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let harness = TestHarness::new(retailers());

    for uri in ["/api/compare", "/api/compare?q=", "/api/compare?q=%20%20"] {
        let response = harness.get(uri, "203.0.113.1").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.json()["error"], "Missing q param");
    }

    assert_eq!(harness.launcher.stats().launches, 0);
}

#[tokio::test]
async fn test_live_comparison_is_ranked() {
    let harness = TestHarness::new(retailers());

    let response = harness.get("/api/compare?q=iphone15", "203.0.113.1").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["source"], "live");

    let data = body["data"].as_array().unwrap();
    let names: Vec<_> = data.iter().map(|r| r["retailer"].as_str().unwrap()).collect();
    assert_eq!(names, ["Flipkart", "Amazon.in", "Croma"]);

    let first = &data[0];
    assert_eq!(first["price"], 69_999);
    assert_eq!(first["shipping"], 599);
    assert_eq!(first["totalCost"], 70_598);
    assert_eq!(first["available"], true);
    assert_eq!(first["linkText"], "Open");
    assert!(first["deliveryDays"].is_null());
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let harness = TestHarness::new(retailers());

    let live = harness.get("/api/compare?q=Pixel%208", "203.0.113.1").await;
    let cached = harness.get("/api/compare?q=%20pixel%208%20", "203.0.113.1").await;

    assert_eq!(live.json()["source"], "live");
    assert_eq!(cached.json()["source"], "cache");
    assert_eq!(live.json()["data"], cached.json()["data"]);
    assert_eq!(harness.launcher.stats().launches, 1);
}

#[tokio::test]
async fn test_launch_failure_is_internal_error() {
    let harness =
        TestHarness::with_launcher(FixtureLauncher::new().failing_launch(), retailers());

    let response = harness.get("/api/compare?q=iphone15", "203.0.113.1").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "internal");
    assert_eq!(harness.cache.len().await, 0);
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let harness = TestHarness::new(retailers());

    for _ in 0..30 {
        let response = harness.get("/api/compare?q=iphone15", "198.51.100.7").await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let limited = harness.get("/api/compare?q=iphone15", "198.51.100.7").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body, "Too many requests, please try again later.");

    let other = harness.get("/api/compare?q=iphone15", "198.51.100.8").await;
    assert_eq!(other.status, StatusCode::OK);

    // Health is not gated
    let health = harness.get("/health", "198.51.100.7").await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_spans_the_rolling_window() {
    let harness = TestHarness::new(retailers());

    for _ in 0..30 {
        let response = harness.get("/api/compare?q=iphone15", "198.51.100.10").await;
        assert_eq!(response.status, StatusCode::OK);
    }

    tokio::time::advance(Duration::from_secs(3)).await;
    let limited = harness.get("/api/compare?q=iphone15", "198.51.100.10").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::advance(Duration::from_secs(50)).await;
    let limited = harness.get("/api/compare?q=iphone15", "198.51.100.10").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::advance(Duration::from_secs(7)).await;
    let admitted = harness.get("/api/compare?q=iphone15", "198.51.100.10").await;
    assert_eq!(admitted.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_requests_skip_the_pipeline() {
    let harness = TestHarness::new(retailers());

    for _ in 0..31 {
        harness.get("/api/compare?q=", "198.51.100.9").await;
    }

    let limited = harness.get("/api/compare?q=iphone15", "198.51.100.9").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(harness.launcher.stats().launches, 0);
}

#[tokio::test]
async fn test_health_reports_cache_and_retailers() {
    let harness = TestHarness::new(retailers());
    harness.get("/api/compare?q=iphone15", "203.0.113.1").await;

    let health = harness.get("/health", "203.0.113.1").await;
    assert_eq!(health.status, StatusCode::OK);

    let body = health.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cachedQueries"], 1);
    assert_eq!(body["retailers"].as_array().unwrap().len(), 5);
    assert!(body["timestamp"].as_str().is_some());
}
