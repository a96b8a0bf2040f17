//! Result cache for finished comparisons.
//!
//! Entries are keyed by [`Query::cache_key`](crate::types::query::Query::cache_key)
//! and hold the ranked sequence behind an `Arc`, so a hit never copies results.

mod memory;

pub use memory::{MemoryResultCache, DEFAULT_TTL};

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::listing::NormalizedResult;

/// Shared, ranked results for one query.
pub type CachedResults = Arc<Vec<NormalizedResult>>;

/// Storage for comparison results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Get fresh results for `key`; expired entries are absent.
    async fn get(&self, key: &str) -> Option<CachedResults>;

    /// Store results for `key`, replacing any previous entry.
    async fn set(&self, key: String, results: Vec<NormalizedResult>) -> CachedResults;

    /// Number of stored entries, expired or not.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
