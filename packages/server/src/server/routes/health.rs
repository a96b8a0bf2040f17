use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    cached_queries: usize,
    retailers: Vec<String>,
    timestamp: DateTime<Utc>,
}

/// Health check endpoint
///
/// Reports cache size and the configured retailers. Not rate limited.
pub async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_queries: state.service.cache().len().await,
        retailers: state.service.aggregator().retailer_names(),
        timestamp: Utc::now(),
    })
}
