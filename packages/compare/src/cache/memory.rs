//! In-process TTL cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{CachedResults, ResultCache};
use crate::types::listing::NormalizedResult;

/// Default entry lifetime: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry {
    results: CachedResults,
    stored_at: Instant,
}

/// Memory-backed [`ResultCache`] with a fixed time-to-live.
///
/// Expired entries are dropped when read, or in bulk by
/// [`purge_expired`](Self::purge_expired). Contents are lost on restart.
pub struct MemoryResultCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.ttl
    }

    /// Remove every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }

    /// Sweep expired entries every `period` until the handle is aborted.
    pub fn spawn_janitor(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "purged expired cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str) -> Option<CachedResults> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if self.is_fresh(entry, now) => return Some(entry.results.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if self.is_fresh(entry, Instant::now()) {
                return Some(entry.results.clone());
            }
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: String, results: Vec<NormalizedResult>) -> CachedResults {
        let results = Arc::new(results);
        self.entries.write().await.insert(
            key,
            Entry {
                results: results.clone(),
                stored_at: Instant::now(),
            },
        );
        results
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
