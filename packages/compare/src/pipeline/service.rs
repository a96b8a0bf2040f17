use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CachedResults, ResultCache};
use crate::error::CompareResult;
use crate::pipeline::Aggregator;
use crate::types::query::Query;

/// Where a comparison's results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Live,
}

/// Ranked results plus their origin.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub source: Source,
    pub data: CachedResults,
}

/// Serves comparisons from the cache, aggregating and storing on a miss.
pub struct CompareService {
    aggregator: Arc<Aggregator>,
    cache: Arc<dyn ResultCache>,
}

impl CompareService {
    pub fn new(aggregator: Arc<Aggregator>, cache: Arc<dyn ResultCache>) -> Self {
        Self { aggregator, cache }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn cache(&self) -> &dyn ResultCache {
        self.cache.as_ref()
    }

    pub async fn lookup(&self, query: &Query) -> CompareResult<Comparison> {
        let key = query.cache_key();

        if let Some(data) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return Ok(Comparison {
                source: Source::Cache,
                data,
            });
        }

        let results = self.aggregator.compare(query).await?;
        let data = self.cache.set(key, results).await;

        Ok(Comparison {
            source: Source::Live,
            data,
        })
    }
}
