// Main entry point for the comparison API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use compare_core::{default_retailers, Aggregator, CompareService, MemoryResultCache};
use compare_server::{
    server::{build_app, AppState, RequestGate},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired cache entries and idle rate-limit buckets are swept.
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,compare_server=debug,compare_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting price comparison API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(backend = ?config.browser_backend, "Configuration loaded");

    let launcher = config.browser_launcher()?;
    let aggregator = Aggregator::new(launcher, default_retailers())
        .with_config(config.aggregator_config());
    tracing::info!(retailers = ?aggregator.retailer_names(), "Retailers registered");

    let cache = Arc::new(MemoryResultCache::with_ttl(config.cache_ttl));
    let _janitor = cache.clone().spawn_janitor(SWEEP_PERIOD);

    let gate = Arc::new(
        RequestGate::new(config.rate_limit_max, config.rate_limit_window)
            .context("Invalid rate limit configuration")?,
    );
    let _pruner = gate.clone().spawn_pruner(SWEEP_PERIOD);

    let service = Arc::new(CompareService::new(Arc::new(aggregator), cache));
    let app = build_app(AppState::new(service, gate));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Compare: http://localhost:{}/api/compare?q=", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
