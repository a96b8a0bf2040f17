//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    middleware,
    routing::get,
    Router,
};
use compare_core::CompareService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::middleware::{extract_client_ip, rate_limit, RequestGate};
use crate::server::routes::{compare_handler, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CompareService>,
    pub gate: Arc<RequestGate>,
}

impl AppState {
    pub fn new(service: Arc<CompareService>, gate: Arc<RequestGate>) -> Self {
        Self { service, gate }
    }
}

/// Build the Axum application router
///
/// `/api/*` sits behind the request gate; `/health` does not.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE]);

    let api = Router::new()
        .route("/compare", get(compare_handler))
        .layer(middleware::from_fn(rate_limit)); // Per-client gate

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(state)) // Add shared state (must be after middlewares that need it)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
