//! Test harness that drives the full router in-process.
//!
//! Browsers are fixtures and retailers are stubs, so no WebDriver endpoint or
//! network access is needed. Client identity comes from `X-Forwarded-For`.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use compare_core::testing::FixtureLauncher;
use compare_core::{Aggregator, CompareService, MemoryResultCache, Retailer};
use compare_server::server::{build_app, AppState, RequestGate};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Response status plus raw body.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

pub struct TestHarness {
    pub app: Router,
    pub launcher: FixtureLauncher,
    pub cache: Arc<MemoryResultCache>,
}

impl TestHarness {
    /// Harness with the default gate (30 requests per minute).
    pub fn new(retailers: Vec<Arc<dyn Retailer>>) -> Self {
        Self::with_launcher(FixtureLauncher::new(), retailers)
    }

    pub fn with_launcher(launcher: FixtureLauncher, retailers: Vec<Arc<dyn Retailer>>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let aggregator = Aggregator::new(Arc::new(launcher.clone()), retailers);
        let cache = Arc::new(MemoryResultCache::new());
        let service = Arc::new(CompareService::new(Arc::new(aggregator), cache.clone()));
        let gate = Arc::new(
            RequestGate::new(30, Duration::from_secs(60)).expect("valid rate limit settings"),
        );

        Self {
            app: build_app(AppState::new(service, gate)),
            launcher,
            cache,
        }
    }

    /// Send a GET as client `ip`.
    pub async fn get(&self, uri: &str, ip: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .expect("valid request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
