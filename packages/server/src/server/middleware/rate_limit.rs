// Per-client request gate
//
// Each client IP gets at most `max` requests in any rolling `window`. Admit
// times are kept per client and a request is refused while `max` of them are
// younger than `window`. Applied in app.rs as a layer on the /api router only.
use anyhow::{anyhow, Result};
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::server::app::AppState;
use crate::server::middleware::ClientIp;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Admits or rejects requests per client IP.
pub struct RequestGate {
    clients: DashMap<IpAddr, VecDeque<Instant>>,
    max: usize,
    window: Duration,
}

impl RequestGate {
    /// Allow `max` requests per rolling `window` for each client.
    pub fn new(max: u32, window: Duration) -> Result<Self> {
        if max == 0 {
            return Err(anyhow!("rate limit max must be > 0"));
        }
        if window.is_zero() {
            return Err(anyhow!("rate limit window must be > 0"));
        }

        Ok(Self {
            clients: DashMap::new(),
            max: max as usize,
            window,
        })
    }

    /// Record one request for `client`. Returns false when over the limit.
    ///
    /// Rejected requests are not recorded.
    pub fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut admitted = self.clients.entry(client).or_default();

        while let Some(&oldest) = admitted.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            admitted.pop_front();
        }

        if admitted.len() >= self.max {
            return false;
        }
        admitted.push_back(now);
        true
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Drop clients with no request inside the window.
    pub fn prune(&self) {
        let now = Instant::now();
        self.clients.retain(|_, admitted| {
            admitted
                .back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
        self.clients.shrink_to_fit();
    }

    /// Prune every `period` until the handle is aborted.
    pub fn spawn_pruner(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.prune();
            }
        })
    }
}

/// Reject requests over the client's quota with 429.
///
/// Requests without a [`ClientIp`] share one bucket keyed by the unspecified
/// address.
pub async fn rate_limit(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ClientIp>()
        .map(|ClientIp(ip)| *ip)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.gate.check(client) {
        tracing::warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
    }

    next.run(request).await
}
